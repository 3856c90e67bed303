//! Main loop: startup sync, second edge detection and stale retries

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
use hal_abstractions::{Actions, NetworkLink, NetworkTime, RtcWriter, Timebase};

use crate::clock::{DstAwareClock, SyncState};
use crate::display::set_level;
use crate::scheduler::{Scheduler, TickReport};

/// Main loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoopConfig {
    /// Pause between polls of the clock
    pub poll_interval_ms: u32,
    /// Pause between failed startup syncs
    pub startup_retry_ms: u32,
    /// Minimum spacing of sync attempts while the clock is stale
    pub resync_retry_ms: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            startup_retry_ms: 10_000,
            resync_retry_ms: 60_000,
        }
    }
}

/// Drives the clock and the scheduler at one-second granularity
///
/// The status indicator is lit while the scheduler runs for a second.
pub struct MainLoop<'a, L, N, R, T, A, P, const M: usize> {
    clock: DstAwareClock<'a, L, N, R, T>,
    scheduler: Scheduler<M>,
    actions: A,
    status: P,
    config: LoopConfig,
    last_second: Option<(u8, u8, u8)>,
    /// Monotonic time of the last stale retry (or of first seeing stale)
    last_retry: Option<u64>,
}

impl<'a, L, N, R, T, A, P, const M: usize> MainLoop<'a, L, N, R, T, A, P, M>
where
    L: NetworkLink,
    N: NetworkTime,
    R: RtcWriter,
    T: Timebase,
    A: Actions,
    P: OutputPin<Error = Infallible>,
{
    pub fn new(
        clock: DstAwareClock<'a, L, N, R, T>,
        scheduler: Scheduler<M>,
        actions: A,
        mut status: P,
        config: LoopConfig,
    ) -> Self {
        set_level(&mut status, false);
        Self {
            clock,
            scheduler,
            actions,
            status,
            config,
            last_second: None,
            last_retry: None,
        }
    }

    /// Sync until the first success
    pub async fn startup(&mut self) {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.clock.sync_from_network().await {
                Ok(()) => {
                    info!("Clock set after {} attempt(s)", attempt);
                    return;
                }
                Err(e) => {
                    warn!(
                        "Startup sync attempt {} failed: {}; retrying in {} ms",
                        attempt, e, self.config.startup_retry_ms
                    );
                    self.clock
                        .timebase_mut()
                        .delay_ms(self.config.startup_retry_ms)
                        .await;
                }
            }
        }
    }

    /// One pass of the loop body
    ///
    /// Returns the scheduler report when a new second was observed.
    pub async fn poll(&mut self) -> Option<TickReport> {
        self.clock.refresh();
        let current = self.clock.current_snapshot();

        let mut report = None;
        let key = current.local.hms();
        if current.is_synchronized() && self.last_second != Some(key) {
            self.last_second = Some(key);
            set_level(&mut self.status, true);
            report = Some(
                self.scheduler
                    .on_second_tick(&current.local, &mut self.clock, &mut self.actions)
                    .await,
            );
            set_level(&mut self.status, false);
        }

        self.retry_if_stale().await;
        report
    }

    /// Startup, then poll forever
    pub async fn run(mut self) -> ! {
        self.startup().await;
        loop {
            self.poll().await;
            self.clock
                .timebase_mut()
                .delay_ms(self.config.poll_interval_ms)
                .await;
        }
    }

    pub fn clock(&self) -> &DstAwareClock<'a, L, N, R, T> {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut DstAwareClock<'a, L, N, R, T> {
        &mut self.clock
    }

    async fn retry_if_stale(&mut self) {
        if self.clock.sync_state() != SyncState::StalePendingResync {
            self.last_retry = None;
            return;
        }
        let now = self.clock.timebase().now_micros();
        let due = match self.last_retry {
            None => {
                self.last_retry = Some(now);
                false
            }
            Some(last) => now.saturating_sub(last) >= u64::from(self.config.resync_retry_ms) * 1000,
        };
        if !due {
            return;
        }
        self.last_retry = Some(now);
        match self.clock.sync_from_network().await {
            Ok(()) => info!("Stale clock resynchronized"),
            Err(e) => warn!("Resync retry failed: {}", e),
        }
    }
}
