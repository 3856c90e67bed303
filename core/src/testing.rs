//! Fake collaborators shared by the unit tests

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{
    ActionError, ActionId, Actions, LocalAddress, NetworkError, NetworkLink, NetworkTime,
    RtcDateTime, RtcWriter, Timebase, TransportError, UtcInstant,
};

use crate::clock::{Resync, SyncError};

pub const ADDRESS: LocalAddress = LocalAddress([192, 168, 1, 50]);

/// Unix seconds of a UTC calendar time
pub fn utc(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> UtcInstant {
    let days = crate::calendar::days_from_civil(year, month, day);
    UtcInstant::from_unix_secs(
        days * crate::calendar::SECONDS_PER_DAY
            + i64::from(hour) * 3600
            + i64::from(minute) * 60
            + i64::from(second),
    )
}

/// Monotonic time that only moves when told to (or when delayed on)
#[derive(Clone, Default)]
pub struct FakeTimebase {
    now: Rc<Cell<u64>>,
}

impl FakeTimebase {
    pub fn advance_ms(&self, ms: u64) {
        self.now.set(self.now.get() + ms * 1000);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.now.get() / 1000
    }
}

impl DelayNs for FakeTimebase {
    async fn delay_ns(&mut self, ns: u32) {
        self.now.set(self.now.get() + u64::from(ns) / 1000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.now.set(self.now.get() + u64::from(us));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.advance_ms(u64::from(ms));
    }
}

impl Timebase for FakeTimebase {
    fn now_micros(&self) -> u64 {
        self.now.get()
    }
}

/// Link that succeeds unless told otherwise
#[derive(Clone, Default)]
pub struct FakeLink {
    pub failures: Rc<RefCell<VecDeque<NetworkError>>>,
    pub connects: Rc<Cell<u32>>,
}

impl NetworkLink for FakeLink {
    async fn connect(&mut self) -> Result<LocalAddress, NetworkError> {
        self.connects.set(self.connects.get() + 1);
        match self.failures.borrow_mut().pop_front() {
            Some(err) => Err(err),
            None => Ok(ADDRESS),
        }
    }
}

/// NTP source: scripted responses first, then the reference time
/// `epoch + elapsed monotonic time` (or `Timeout` without a reference)
#[derive(Clone, Default)]
pub struct FakeNtp {
    pub script: Rc<RefCell<VecDeque<Result<UtcInstant, TransportError>>>>,
    pub calls: Rc<Cell<u32>>,
    reference: Option<(FakeTimebase, UtcInstant)>,
}

impl FakeNtp {
    pub fn scripted(responses: impl IntoIterator<Item = Result<UtcInstant, TransportError>>) -> Self {
        Self {
            script: Rc::new(RefCell::new(responses.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Reports `epoch` at monotonic time zero and follows `timebase`
    pub fn following(timebase: &FakeTimebase, epoch: UtcInstant) -> Self {
        Self {
            reference: Some((timebase.clone(), epoch)),
            ..Self::default()
        }
    }

    pub fn push(&self, response: Result<UtcInstant, TransportError>) {
        self.script.borrow_mut().push_back(response);
    }
}

impl NetworkTime for FakeNtp {
    async fn fetch_utc_instant(&mut self) -> Result<UtcInstant, TransportError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(response) = self.script.borrow_mut().pop_front() {
            return response;
        }
        match &self.reference {
            Some((timebase, epoch)) => {
                Ok(epoch.add_secs((timebase.now_micros() / 1_000_000) as i64))
            }
            None => Err(TransportError::Timeout),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeRtc {
    pub writes: Rc<RefCell<Vec<RtcDateTime>>>,
}

impl RtcWriter for FakeRtc {
    fn write_rtc(&mut self, datetime: RtcDateTime) {
        self.writes.borrow_mut().push(datetime);
    }
}

/// Records invocations; `failing` always reports an actuator error
#[derive(Clone, Default)]
pub struct FakeActions {
    pub invoked: Rc<RefCell<Vec<ActionId>>>,
    pub failing: Option<ActionId>,
}

impl Actions for FakeActions {
    fn invoke(&mut self, id: ActionId) -> Result<(), ActionError> {
        self.invoked.borrow_mut().push(id);
        if self.failing == Some(id) {
            Err(ActionError::Actuator)
        } else {
            Ok(())
        }
    }
}

/// Resync target that counts calls
#[derive(Default)]
pub struct FakeResync {
    pub calls: u32,
    pub fail_with: Option<SyncError>,
}

impl Resync for FakeResync {
    async fn resync(&mut self) -> Result<(), SyncError> {
        self.calls += 1;
        match self.fail_with {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Identity of a mock pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinEvent {
    Common(usize),
    Segment(usize),
    Status,
}

/// Shared record of every level change, in order
#[derive(Clone, Default)]
pub struct PinLog {
    events: Rc<RefCell<Vec<(PinEvent, bool)>>>,
    levels: Rc<RefCell<HashMap<PinEvent, bool>>>,
}

impl PinLog {
    pub fn pin(&self, id: PinEvent) -> MockPin {
        MockPin {
            id,
            log: self.clone(),
        }
    }

    /// Forget the events recorded so far; current levels are kept
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn events(&self) -> Vec<(PinEvent, bool)> {
        self.events.borrow().clone()
    }

    /// Last level driven on `id`
    pub fn level(&self, id: PinEvent) -> Option<bool> {
        self.levels.borrow().get(&id).copied()
    }

    fn record(&self, id: PinEvent, high: bool) {
        self.events.borrow_mut().push((id, high));
        self.levels.borrow_mut().insert(id, high);
    }
}

pub struct MockPin {
    id: PinEvent,
    log: PinLog,
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.record(self.id, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.record(self.id, true);
        Ok(())
    }
}
