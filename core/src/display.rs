//! Multiplexed seven-segment display driver
//!
//! The bank shares its eight segment lines between all positions; each
//! position has its own common line. A periodic timer interrupt calls
//! [`DisplayMultiplexer::on_timer_fire`], which lights exactly one position
//! per firing. At 600 Hz a six-digit bank is redrawn 100 times per second.
//!
//! Ordering inside one firing is what prevents ghosting: the old common
//! line is released before the segment lines change, and the new common
//! line is enabled last.

use core::convert::Infallible;

use embedded_hal::digital::{OutputPin, PinState};

use crate::local_time::LocalTime;
use crate::segment::{self, BLANK, SEGMENT_COUNT};
use crate::snapshot::SnapshotCell;

/// Hour rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HourMode {
    /// 1..=12, leading zero blanked
    H12,
    /// 00..=23
    H24,
}

/// What a physical position shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DigitRole {
    HourTens,
    HourUnits,
    MinuteTens,
    MinuteUnits,
    SecondTens,
    SecondUnits,
}

impl DigitRole {
    pub const fn is_seconds(self) -> bool {
        matches!(self, Self::SecondTens | Self::SecondUnits)
    }

    /// Glyph index (0..=9 or [`BLANK`]) this role shows for `local`
    pub fn glyph(self, local: &LocalTime, mode: HourMode) -> u8 {
        let hour = match mode {
            HourMode::H24 => local.hour(),
            HourMode::H12 => match local.hour() % 12 {
                0 => 12,
                h => h,
            },
        };
        match self {
            Self::HourTens if mode == HourMode::H12 && hour < 10 => BLANK,
            Self::HourTens => hour / 10,
            Self::HourUnits => hour % 10,
            Self::MinuteTens => local.minute() / 10,
            Self::MinuteUnits => local.minute() % 10,
            Self::SecondTens => local.second() / 10,
            Self::SecondUnits => local.second() % 10,
        }
    }
}

/// Display bank layout and electrical polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig<const N: usize> {
    pub hour_mode: HourMode,
    /// When false the seconds positions are skipped and kept dark
    pub show_seconds: bool,
    /// Role of each physical position, left to right
    pub roles: [DigitRole; N],
    /// Common line level that selects a position
    pub common_active_high: bool,
    /// Segment line level that lights a segment
    pub segment_active_high: bool,
}

impl DisplayConfig<6> {
    /// HH:MM:SS, 24-hour, common-cathode through high-side drivers
    pub const SIX_DIGIT: Self = Self {
        hour_mode: HourMode::H24,
        show_seconds: true,
        roles: [
            DigitRole::HourTens,
            DigitRole::HourUnits,
            DigitRole::MinuteTens,
            DigitRole::MinuteUnits,
            DigitRole::SecondTens,
            DigitRole::SecondUnits,
        ],
        common_active_high: true,
        segment_active_high: true,
    };
}

impl DisplayConfig<4> {
    /// HH:MM, 24-hour
    pub const FOUR_DIGIT: Self = Self {
        hour_mode: HourMode::H24,
        show_seconds: false,
        roles: [
            DigitRole::HourTens,
            DigitRole::HourUnits,
            DigitRole::MinuteTens,
            DigitRole::MinuteUnits,
        ],
        common_active_high: true,
        segment_active_high: true,
    };
}

/// Round-robin driver for an `N`-position bank
///
/// Owned by the timer interrupt; holds no reference to the clock and only
/// reads the shared [`SnapshotCell`].
pub struct DisplayMultiplexer<C, S, const N: usize> {
    commons: [C; N],
    segments: [S; SEGMENT_COUNT],
    config: DisplayConfig<N>,
    /// Physical indices in refresh order; only the first `visible` are used
    order: [usize; N],
    visible: usize,
    cursor: usize,
    active: Option<usize>,
}

impl<C, S, const N: usize> DisplayMultiplexer<C, S, N>
where
    C: OutputPin<Error = Infallible>,
    S: OutputPin<Error = Infallible>,
{
    /// Take the pins and drive every line to its inactive level
    pub fn new(commons: [C; N], segments: [S; SEGMENT_COUNT], config: DisplayConfig<N>) -> Self {
        let mut order = [0; N];
        let mut visible = 0;
        for (index, role) in config.roles.iter().enumerate() {
            if config.show_seconds || !role.is_seconds() {
                order[visible] = index;
                visible += 1;
            }
        }

        let mut mux = Self {
            commons,
            segments,
            config,
            order,
            visible,
            cursor: 0,
            active: None,
        };
        for index in 0..N {
            mux.deselect(index);
        }
        mux.drive_segments(segment::encode(BLANK));
        mux
    }

    /// Render the next position from the latest snapshot
    ///
    /// Call once per timer firing.
    pub fn on_timer_fire(&mut self, snapshot: &SnapshotCell) {
        if let Some(previous) = self.active.take() {
            self.deselect(previous);
        }
        if self.visible == 0 {
            return;
        }

        let position = self.order[self.cursor];
        self.cursor = (self.cursor + 1) % self.visible;

        let current = snapshot.read();
        let glyph = if current.is_synchronized() {
            self.config.roles[position].glyph(&current.local, self.config.hour_mode)
        } else {
            BLANK
        };
        self.drive_segments(segment::encode(glyph));

        set_level(
            &mut self.commons[position],
            self.config.common_active_high,
        );
        self.active = Some(position);
    }

    /// Currently selected physical position
    pub fn active_position(&self) -> Option<usize> {
        self.active
    }

    /// Number of positions in the round-robin
    pub fn visible_positions(&self) -> usize {
        self.visible
    }

    /// Release every line and return the pins
    pub fn release(mut self) -> ([C; N], [S; SEGMENT_COUNT]) {
        if let Some(previous) = self.active.take() {
            self.deselect(previous);
        }
        (self.commons, self.segments)
    }

    fn deselect(&mut self, index: usize) {
        set_level(&mut self.commons[index], !self.config.common_active_high);
    }

    fn drive_segments(&mut self, mask: segment::SegmentMask) {
        let active_high = self.config.segment_active_high;
        for (index, pin) in self.segments.iter_mut().enumerate() {
            set_level(pin, segment::is_lit(mask, index) == active_high);
        }
    }
}

pub(crate) fn set_level<P: OutputPin<Error = Infallible>>(pin: &mut P, high: bool) {
    match pin.set_state(PinState::from(high)) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}
