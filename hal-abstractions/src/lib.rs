//! Hardware abstraction traits for the NTP wall clock
//!
//! This crate defines the collaborators the clock core talks to: network
//! association, the NTP exchange, the hardware RTC, the monotonic timebase
//! and the actuators fired by the scheduler. BSPs implement these traits.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod action;
pub mod network;
pub mod rtc;
pub mod time;

pub use action::{ActionError, ActionId, Actions};
pub use network::{LocalAddress, NetworkError, NetworkLink, NetworkTime, TransportError};
pub use rtc::{RtcDateTime, RtcWriter};
pub use time::{Timebase, UtcInstant};
