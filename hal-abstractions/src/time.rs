//! Absolute time and the monotonic timebase

use embedded_hal_async::delay::DelayNs;

/// NTP epoch offset (1900-01-01 to 1970-01-01 in seconds)
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// Length of one NTP era (2^32 seconds)
const NTP_ERA_SECS: i64 = 1 << 32;

/// An absolute point in time, in whole seconds since the Unix epoch (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcInstant {
    unix_secs: i64,
}

impl UtcInstant {
    /// Create an instant from Unix epoch seconds
    pub const fn from_unix_secs(unix_secs: i64) -> Self {
        Self { unix_secs }
    }

    /// Unix epoch seconds
    pub const fn unix_secs(self) -> i64 {
        self.unix_secs
    }

    /// Convert from an NTP timestamp (seconds since 1900-01-01)
    ///
    /// The fraction (units of 2^-32 s) is rounded to the nearest second.
    /// Timestamps with the top bit clear are taken to be in NTP era 1
    /// (on or after 2036-02-07), which keeps the conversion correct for
    /// every year the clock accepts.
    pub fn from_ntp(ntp_secs: u32, ntp_frac: u32) -> Self {
        let mut secs = i64::from(ntp_secs);
        if ntp_secs & 0x8000_0000 == 0 {
            secs += NTP_ERA_SECS;
        }
        if ntp_frac >= 0x8000_0000 {
            secs += 1;
        }
        Self::from_unix_secs(secs - NTP_UNIX_OFFSET)
    }

    /// Offset by a signed number of seconds, saturating at the `i64` range
    #[must_use]
    pub const fn add_secs(self, secs: i64) -> Self {
        Self::from_unix_secs(self.unix_secs.saturating_add(secs))
    }
}

/// Monotonic timebase with async delays
///
/// `now_micros` never goes backwards and keeps counting across network
/// stalls; the clock anchors NTP results to it between syncs.
pub trait Timebase: DelayNs {
    /// Microseconds since an arbitrary, fixed origin (usually boot)
    fn now_micros(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntp_to_unix_conversion() {
        // 2024-01-01 00:00:00 UTC
        let ntp_secs = (1_704_067_200 + NTP_UNIX_OFFSET) as u32;
        let instant = UtcInstant::from_ntp(ntp_secs, 0);
        assert_eq!(instant.unix_secs(), 1_704_067_200);
    }

    #[test]
    fn test_ntp_fraction_rounds_to_nearest_second() {
        let ntp_secs = (1_704_067_200 + NTP_UNIX_OFFSET) as u32;
        assert_eq!(
            UtcInstant::from_ntp(ntp_secs, 0x7FFF_FFFF).unix_secs(),
            1_704_067_200
        );
        assert_eq!(
            UtcInstant::from_ntp(ntp_secs, 0x8000_0000).unix_secs(),
            1_704_067_201
        );
    }

    #[test]
    fn test_ntp_era_rollover() {
        // 2036-02-07 06:28:16 UTC is NTP second 0 of era 1
        let instant = UtcInstant::from_ntp(0, 0);
        assert_eq!(instant.unix_secs(), 2_085_978_496);
        let later = UtcInstant::from_ntp(100, 0);
        assert_eq!(later.unix_secs(), 2_085_978_596);
    }

    #[test]
    fn test_add_secs() {
        let instant = UtcInstant::from_unix_secs(100);
        assert_eq!(instant.add_secs(-40).unix_secs(), 60);
        assert_eq!(
            UtcInstant::from_unix_secs(i64::MAX).add_secs(1).unix_secs(),
            i64::MAX
        );
    }
}
