//! Platform-agnostic clock logic
//!
//! Everything between the network time source and the display pins that
//! does not touch hardware: the DST rule, local time derivation, the
//! lock-free snapshot shared with the display interrupt, digit
//! multiplexing, the per-second scheduler and the main loop. Hardware
//! enters through the traits in `hal-abstractions`, so the whole crate
//! runs under `cargo test` on the host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// Must come first so the logging macros are visible in every module
mod fmt;

pub mod calendar;
pub mod clock;
pub mod display;
pub mod dst;
pub mod local_time;
pub mod runner;
pub mod scheduler;
pub mod segment;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use clock::{ClockConfig, DstAwareClock, Resync, SyncError, SyncState};
pub use display::{DigitRole, DisplayConfig, DisplayMultiplexer, HourMode};
pub use dst::{DstRule, Regime, RuleError, TransitionPair, TransitionReference, TransitionSpec};
pub use local_time::LocalTime;
pub use runner::{LoopConfig, MainLoop};
pub use scheduler::{
    ScheduleError, Scheduler, TickReport, TriggerAction, TriggerRule, MAX_CATCH_UP_SECS,
};
pub use snapshot::{SnapshotCell, TimeSnapshot};
