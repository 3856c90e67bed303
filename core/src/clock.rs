//! DST-aware network clock
//!
//! Turns NTP results into published local time. Between syncs the clock
//! extrapolates from an anchor (UTC instant plus the monotonic time it was
//! received at), so the displayed seconds keep running and a DST switch
//! takes effect at its exact second without another network round trip.
//!
//! State machine:
//!
//! ```text
//! Unsynchronized --sync ok--> Synchronized --mark_stale--> StalePendingResync
//!                                  ^                              |
//!                                  +----------- sync ok ----------+
//! ```
//!
//! A failed sync never touches the published snapshot or the state.

use core::future::Future;

use hal_abstractions::{
    LocalAddress, NetworkError, NetworkLink, NetworkTime, RtcWriter, Timebase, TransportError,
    UtcInstant,
};

use crate::calendar::civil_from_unix;
use crate::dst::{DstRule, RuleError, TransitionPair};
use crate::local_time::LocalTime;
use crate::snapshot::{SnapshotCell, TimeSnapshot};

/// Clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Region rule used to derive local time
    pub rule: DstRule,
    /// Wait after an NTP timeout before reporting it
    pub timeout_backoff_ms: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            rule: DstRule::CENTRAL_EUROPE,
            timeout_backoff_ms: 5000,
        }
    }
}

/// Synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncState {
    /// No sync has succeeded yet
    Unsynchronized,
    Synchronized,
    /// Time is set but a resync was requested and has not succeeded yet
    StalePendingResync,
}

/// Sync errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncError {
    /// Network association failed
    Network(NetworkError),
    /// NTP request timed out (after the backoff)
    Timeout,
    /// NTP exchange failed; the link will be re-associated
    Transport(TransportError),
    /// No DST rule data for the received year
    Rule(RuleError),
}

impl From<NetworkError> for SyncError {
    fn from(err: NetworkError) -> Self {
        Self::Network(err)
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Self::Timeout,
            other => Self::Transport(other),
        }
    }
}

impl From<RuleError> for SyncError {
    fn from(err: RuleError) -> Self {
        Self::Rule(err)
    }
}

impl core::fmt::Display for SyncError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "Network error: {e}"),
            Self::Timeout => write!(f, "NTP request timed out"),
            Self::Transport(e) => write!(f, "NTP transport error: {e}"),
            Self::Rule(e) => write!(f, "DST rule error: {e}"),
        }
    }
}

impl core::error::Error for SyncError {}

/// Entry point the scheduler uses for the built-in resync action
pub trait Resync {
    /// Mark the time stale and sync from the network once
    fn resync(&mut self) -> impl Future<Output = Result<(), SyncError>>;
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    utc: UtcInstant,
    mono_micros: u64,
}

/// Network-synchronized local clock
///
/// Sole writer of the [`SnapshotCell`] it is given.
pub struct DstAwareClock<'a, L, N, R, T> {
    config: ClockConfig,
    snapshot: &'a SnapshotCell,
    link: L,
    ntp: N,
    rtc: R,
    timebase: T,
    state: SyncState,
    /// Some while the link is associated
    address: Option<LocalAddress>,
    anchor: Option<Anchor>,
    transitions: Option<TransitionPair>,
    /// Year already reported as outside the rule range
    warned_year: Option<u16>,
    last_published: Option<UtcInstant>,
}

impl<'a, L, N, R, T> DstAwareClock<'a, L, N, R, T>
where
    L: NetworkLink,
    N: NetworkTime,
    R: RtcWriter,
    T: Timebase,
{
    pub fn new(
        config: ClockConfig,
        snapshot: &'a SnapshotCell,
        link: L,
        ntp: N,
        rtc: R,
        timebase: T,
    ) -> Result<Self, RuleError> {
        config.rule.validate()?;
        Ok(Self {
            config,
            snapshot,
            link,
            ntp,
            rtc,
            timebase,
            state: SyncState::Unsynchronized,
            address: None,
            anchor: None,
            transitions: None,
            warned_year: None,
            last_published: None,
        })
    }

    /// Associate if needed, fetch network time and publish it
    ///
    /// Makes exactly one NTP request. On failure the published snapshot,
    /// the RTC and the sync state are left as they were.
    pub async fn sync_from_network(&mut self) -> Result<(), SyncError> {
        info!(
            "UTC time before sync: {}",
            self.utc_now().map(UtcInstant::unix_secs)
        );

        if self.address.is_none() {
            match self.link.connect().await {
                Ok(address) => {
                    info!("Network associated, address {}", address);
                    self.address = Some(address);
                }
                Err(e) => {
                    warn!("Network association failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        let utc = match self.ntp.fetch_utc_instant().await {
            Ok(utc) => utc,
            Err(TransportError::Timeout) => {
                warn!(
                    "NTP request timed out, backing off {} ms",
                    self.config.timeout_backoff_ms
                );
                self.timebase
                    .delay_ms(self.config.timeout_backoff_ms)
                    .await;
                return Err(SyncError::Timeout);
            }
            Err(e) => {
                warn!("NTP request failed: {}, dropping association", e);
                self.address = None;
                return Err(e.into());
            }
        };
        let mono_micros = self.timebase.now_micros();

        let pair = match self.transitions_for(utc_year(utc)) {
            Ok(pair) => pair,
            Err(e) => {
                error!("Cannot localize {}: {}", utc.unix_secs(), e);
                return Err(e.into());
            }
        };
        let local = self.localize_with(&pair, utc);
        let generation = self.snapshot.publish(&local);
        self.rtc.write_rtc(local.to_rtc());

        self.anchor = Some(Anchor { utc, mono_micros });
        self.last_published = Some(utc);
        self.state = SyncState::Synchronized;

        info!("UTC time after sync: {}", utc.unix_secs());
        info!("Local time: {} (generation {})", local, generation);
        Ok(())
    }

    /// Publish a new snapshot if the extrapolated UTC second has changed
    ///
    /// Returns the published snapshot, or `None` before the first sync and
    /// when still within the last published second.
    pub fn refresh(&mut self) -> Option<TimeSnapshot> {
        let utc = self.utc_now()?;
        if self.last_published == Some(utc) {
            return None;
        }
        let local = self.localize(utc);
        let generation = self.snapshot.publish(&local);
        self.last_published = Some(utc);
        Some(TimeSnapshot { local, generation })
    }

    /// Latest published snapshot; never blocks
    pub fn current_snapshot(&self) -> TimeSnapshot {
        self.snapshot.read()
    }

    pub fn sync_state(&self) -> SyncState {
        self.state
    }

    /// Whether the time is current: false before the first sync and while
    /// a requested resync has not succeeded
    pub fn is_time_set(&self) -> bool {
        self.state == SyncState::Synchronized
    }

    /// Whether any sync has ever succeeded
    pub fn has_ever_synced(&self) -> bool {
        self.state != SyncState::Unsynchronized
    }

    /// Request a resync; no effect before the first sync
    pub fn mark_stale(&mut self) {
        if self.state == SyncState::Synchronized {
            debug!("Clock marked stale");
            self.state = SyncState::StalePendingResync;
        }
    }

    /// Current UTC time extrapolated from the last sync
    pub fn utc_now(&self) -> Option<UtcInstant> {
        let anchor = self.anchor?;
        let elapsed = self.timebase.now_micros().saturating_sub(anchor.mono_micros);
        Some(anchor.utc.add_secs((elapsed / 1_000_000) as i64))
    }

    /// Address obtained by the current association
    pub fn local_address(&self) -> Option<LocalAddress> {
        self.address
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn timebase(&self) -> &T {
        &self.timebase
    }

    pub fn timebase_mut(&mut self) -> &mut T {
        &mut self.timebase
    }

    /// Transition pair for `year`, recomputed when the year changes
    fn transitions_for(&mut self, year: u16) -> Result<TransitionPair, RuleError> {
        if let Some(pair) = self.transitions.filter(|pair| pair.year == year) {
            return Ok(pair);
        }
        let pair = self.config.rule.transitions(year)?;
        debug!(
            "DST transitions for {}: {} / {}",
            year,
            pair.spring_forward.unix_secs(),
            pair.fall_back.unix_secs()
        );
        self.transitions = Some(pair);
        Ok(pair)
    }

    /// Local time for `utc`, falling back to standard time past the rule range
    fn localize(&mut self, utc: UtcInstant) -> LocalTime {
        let year = utc_year(utc);
        match self.transitions_for(year) {
            Ok(pair) => self.localize_with(&pair, utc),
            Err(e) => {
                if self.warned_year != Some(year) {
                    warn!("{}; showing standard time", e);
                    self.warned_year = Some(year);
                }
                LocalTime::from_utc(utc, self.config.rule.standard_offset_secs, false)
            }
        }
    }

    fn localize_with(&self, pair: &TransitionPair, utc: UtcInstant) -> LocalTime {
        let regime = pair.classify(utc);
        LocalTime::from_utc(
            utc,
            self.config.rule.offset_secs(regime),
            regime.is_daylight(),
        )
    }
}

impl<L, N, R, T> Resync for DstAwareClock<'_, L, N, R, T>
where
    L: NetworkLink,
    N: NetworkTime,
    R: RtcWriter,
    T: Timebase,
{
    async fn resync(&mut self) -> Result<(), SyncError> {
        self.mark_stale();
        self.sync_from_network().await
    }
}

fn utc_year(utc: UtcInstant) -> u16 {
    civil_from_unix(utc.unix_secs())
        .year
        .clamp(0, i32::from(u16::MAX)) as u16
}
