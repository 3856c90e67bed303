#![deny(unsafe_code)]
#![deny(warnings)]
//! Door relays driven by scheduled actions
//!
//! Two relay lines, one per direction. The last command stays latched
//! until the opposite one is issued.

use core::convert::Infallible;

use defmt::info;
use embedded_hal::digital::OutputPin;
use hal_abstractions::{ActionError, ActionId, Actions};

/// Drive the door open
pub const OPEN: ActionId = ActionId(0);
/// Drive the door closed
pub const CLOSE: ActionId = ActionId(1);

pub struct DoorActuator<P> {
    open: P,
    close: P,
}

impl<P: OutputPin<Error = Infallible>> DoorActuator<P> {
    /// Take both relay lines and release them
    pub fn new(mut open: P, mut close: P) -> Self {
        drive_low(&mut open);
        drive_low(&mut close);
        Self { open, close }
    }

    fn latch(&mut self, opening: bool) -> Result<(), ActionError> {
        // Release the opposite relay before energizing
        let (release, energize) = if opening {
            (&mut self.close, &mut self.open)
        } else {
            (&mut self.open, &mut self.close)
        };
        release.set_low().map_err(|_| ActionError::Actuator)?;
        energize.set_high().map_err(|_| ActionError::Actuator)
    }
}

impl<P: OutputPin<Error = Infallible>> Actions for DoorActuator<P> {
    fn invoke(&mut self, id: ActionId) -> Result<(), ActionError> {
        match id {
            OPEN => {
                info!("Opening door");
                self.latch(true)
            }
            CLOSE => {
                info!("Closing door");
                self.latch(false)
            }
            other => Err(ActionError::UnknownAction(other)),
        }
    }
}

fn drive_low<P: OutputPin<Error = Infallible>>(pin: &mut P) {
    match pin.set_low() {
        Ok(()) => {}
        Err(never) => match never {},
    }
}
