//! Local wall-clock time as shown on the display

use hal_abstractions::{RtcDateTime, UtcInstant};

use crate::calendar::civil_from_unix;

/// Broken-down local time
///
/// Only the clock produces these; everything else reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    weekday: u8,
    day_of_year: u16,
    dst: bool,
}

impl LocalTime {
    /// All-zero placeholder carried by the unsynchronized snapshot
    pub const UNSET: Self = Self {
        year: 0,
        month: 0,
        day: 0,
        hour: 0,
        minute: 0,
        second: 0,
        weekday: 0,
        day_of_year: 0,
        dst: false,
    };

    /// Apply a UTC offset and break the result into fields
    pub(crate) fn from_utc(utc: UtcInstant, offset_secs: i32, dst: bool) -> Self {
        let civil = civil_from_unix(utc.unix_secs() + i64::from(offset_secs));
        Self {
            year: civil.year.clamp(0, i32::from(u16::MAX)) as u16,
            month: civil.month,
            day: civil.day,
            hour: civil.hour,
            minute: civil.minute,
            second: civil.second,
            weekday: civil.weekday,
            day_of_year: civil.day_of_year,
            dst,
        }
    }

    /// Rebuild from already validated fields (snapshot unpacking)
    #[allow(clippy::too_many_arguments)]
    pub(crate) const fn from_fields(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        weekday: u8,
        day_of_year: u16,
        dst: bool,
    ) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            weekday,
            day_of_year,
            dst,
        }
    }

    pub const fn year(&self) -> u16 {
        self.year
    }

    /// 1..=12
    pub const fn month(&self) -> u8 {
        self.month
    }

    /// 1..=31
    pub const fn day(&self) -> u8 {
        self.day
    }

    /// 0..=23
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    pub const fn minute(&self) -> u8 {
        self.minute
    }

    /// 0..=60; 60 only for a leap second
    pub const fn second(&self) -> u8 {
        self.second
    }

    /// 0..=6, Monday = 0
    pub const fn weekday(&self) -> u8 {
        self.weekday
    }

    /// 1..=366
    pub const fn day_of_year(&self) -> u16 {
        self.day_of_year
    }

    /// Whether daylight-saving time is in effect
    pub const fn is_dst(&self) -> bool {
        self.dst
    }

    /// Seconds since local midnight
    pub const fn seconds_of_day(&self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }

    /// (hour, minute, second) key used for second edge detection
    pub const fn hms(&self) -> (u8, u8, u8) {
        (self.hour, self.minute, self.second)
    }

    /// Fields in RTC convention (weekday 1..=7, Monday = 1)
    pub const fn to_rtc(&self) -> RtcDateTime {
        RtcDateTime {
            year: self.year,
            month: self.month,
            day: self.day,
            weekday: self.weekday + 1,
            hour: self.hour,
            minute: self.minute,
            second: self.second,
        }
    }

    /// Test helper: a local time on a given day at a given time
    #[cfg(test)]
    pub(crate) fn at(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let days = crate::calendar::days_from_civil(i32::from(year), month, day);
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            weekday: crate::calendar::weekday_from_days(days),
            day_of_year: crate::calendar::day_of_year(i32::from(year), month, day),
            dst: false,
        }
    }
}

impl core::fmt::Display for LocalTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}{}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            if self.dst { " DST" } else { "" }
        )
    }
}
