//! Once-per-day trigger rules evaluated every local second
//!
//! Rules match the local (hour, minute, second) exactly. Each rule fires at
//! most once per local calendar day, so the hour repeated after fall back
//! and backward corrections never fire it twice. Seconds skipped by a
//! short forward jump (a blocking resync, a late poll) are caught up;
//! longer jumps such as the spring-forward gap or the first sync are not.

use core::ops::RangeInclusive;

use hal_abstractions::{ActionId, Actions};
use heapless::Vec;

use crate::clock::Resync;
use crate::local_time::LocalTime;

/// Longest forward jump whose skipped seconds are still evaluated
pub const MAX_CATCH_UP_SECS: u32 = 60;

/// What a rule does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerAction {
    /// Mark the clock stale and sync from the network
    Resync,
    /// Run an external action
    Invoke(ActionId),
}

/// Fire `action` at hour:minute:second local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerRule {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub action: TriggerAction,
}

impl TriggerRule {
    pub const fn new(hour: u8, minute: u8, second: u8, action: TriggerAction) -> Self {
        Self {
            hour,
            minute,
            second,
            action,
        }
    }

    pub const fn seconds_of_day(&self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        if self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err(ScheduleError::InvalidTime {
                hour: self.hour,
                minute: self.minute,
                second: self.second,
            });
        }
        Ok(())
    }
}

/// Schedule construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// Rule time outside 00:00:00..=23:59:59
    InvalidTime { hour: u8, minute: u8, second: u8 },
    /// More rules than the scheduler capacity
    TooManyRules,
}

impl core::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidTime {
                hour,
                minute,
                second,
            } => write!(f, "Invalid trigger time {hour:02}:{minute:02}:{second:02}"),
            Self::TooManyRules => write!(f, "Too many trigger rules"),
        }
    }
}

impl core::error::Error for ScheduleError {}

/// Outcome of one second tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Rules whose action ran
    pub fired: u8,
    /// Of those, actions that reported an error
    pub failed: u8,
    /// The second had already been evaluated
    pub duplicate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DayKey {
    year: u16,
    day_of_year: u16,
}

impl DayKey {
    fn of(local: &LocalTime) -> Self {
        Self {
            year: local.year(),
            day_of_year: local.day_of_year(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tick {
    day: DayKey,
    second: u32,
}

#[derive(Debug)]
struct Entry {
    rule: TriggerRule,
    last_fired: Option<DayKey>,
}

/// Trigger rule evaluator with capacity for `N` rules
#[derive(Debug)]
pub struct Scheduler<const N: usize> {
    entries: Vec<Entry, N>,
    last_tick: Option<Tick>,
}

impl<const N: usize> Scheduler<N> {
    pub fn new(rules: &[TriggerRule]) -> Result<Self, ScheduleError> {
        let mut entries = Vec::new();
        for rule in rules {
            rule.validate()?;
            entries
                .push(Entry {
                    rule: *rule,
                    last_fired: None,
                })
                .map_err(|_| ScheduleError::TooManyRules)?;
        }
        Ok(Self {
            entries,
            last_tick: None,
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = &TriggerRule> {
        self.entries.iter().map(|entry| &entry.rule)
    }

    /// Evaluate the rules for a newly observed local second
    pub async fn on_second_tick(
        &mut self,
        current: &LocalTime,
        clock: &mut impl Resync,
        actions: &mut impl Actions,
    ) -> TickReport {
        let tick = Tick {
            day: DayKey::of(current),
            second: current.seconds_of_day(),
        };
        let window = match self.window(tick) {
            Some(window) => window,
            None => {
                debug!("Second {} already evaluated", tick.second);
                return TickReport {
                    duplicate: true,
                    ..TickReport::default()
                };
            }
        };
        self.last_tick = Some(tick);
        if window.start() != window.end() {
            info!(
                "Catching up seconds {}..={}",
                window.start(),
                window.end()
            );
        }

        let mut report = TickReport::default();
        for entry in self.entries.iter_mut() {
            if !window.contains(&entry.rule.seconds_of_day()) || entry.last_fired == Some(tick.day)
            {
                continue;
            }
            entry.last_fired = Some(tick.day);
            report.fired += 1;

            let ok = match entry.rule.action {
                TriggerAction::Resync => {
                    info!("Scheduled resync at {}", current);
                    match clock.resync().await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Scheduled resync failed: {}", e);
                            false
                        }
                    }
                }
                TriggerAction::Invoke(id) => {
                    info!("Invoking action {} at {}", id.0, current);
                    match actions.invoke(id) {
                        Ok(()) => true,
                        Err(e) => {
                            error!("Action {} failed: {}", id.0, e);
                            false
                        }
                    }
                }
            };
            if !ok {
                report.failed += 1;
            }
        }
        report
    }

    /// Seconds of the day to evaluate, or `None` for a repeated second
    fn window(&self, tick: Tick) -> Option<RangeInclusive<u32>> {
        match self.last_tick {
            Some(last) if last == tick => None,
            Some(last)
                if last.day == tick.day
                    && tick.second > last.second
                    && tick.second - last.second <= MAX_CATCH_UP_SECS =>
            {
                Some(last.second + 1..=tick.second)
            }
            _ => Some(tick.second..=tick.second),
        }
    }
}
