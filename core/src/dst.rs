//! Daylight-saving transition rule
//!
//! The two yearly switch days are computed in closed form rather than
//! looked up in a table:
//!
//! ```text
//! day = boundary - (offset_constant + floor(5 * year / 4)) mod 7
//! ```
//!
//! `floor(5y/4) = y + floor(y/4)` advances by one weekday per year plus one
//! per leap year, which holds for dates from March onwards and for years
//! 1901..=2099 (2000 is a leap year). `boundary` is the last day of the
//! window the Sunday must fall in: 31 for "last Sunday of a 31-day month",
//! 7 for "first Sunday". Ref: http://www.webexhibits.org/daylightsaving/i.html
//!
//! Outside a rule's `first_year..=last_year` range the formula is not
//! trusted and [`DstRule::transitions`] fails with
//! [`RuleError::YearOutOfRange`].
//!
//! Boundary policy: an instant equal to a transition instant belongs to
//! the new regime (`now < spring_forward` is standard time, `now <
//! fall_back` is daylight time, anything later is standard time again).

use hal_abstractions::UtcInstant;

use crate::calendar::{days_from_civil, days_in_month, SECONDS_PER_DAY};

/// Time base in which a transition's hour and minute are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransitionReference {
    /// Hour and minute are UTC
    Utc,
    /// Hour and minute are wall-clock time of the regime in force before the switch
    LocalBefore,
}

/// One yearly switch (spring forward or fall back)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransitionSpec {
    /// Month of the switch (3..=12)
    pub month: u8,
    /// Last day of the window containing the switch Sunday
    pub boundary: u8,
    /// Region and month specific constant of the closed form
    pub offset_constant: u8,
    pub hour: u8,
    pub minute: u8,
    pub reference: TransitionReference,
}

impl TransitionSpec {
    /// Day of month of the switch in `year`
    pub const fn day(&self, year: u16) -> u8 {
        let k = (self.offset_constant as u32 + 5 * year as u32 / 4) % 7;
        self.boundary - k as u8
    }

    fn instant(&self, year: u16, offset_before_secs: i32) -> UtcInstant {
        let days = days_from_civil(i32::from(year), self.month, self.day(year));
        let wall = days * SECONDS_PER_DAY + i64::from(self.hour) * 3600 + i64::from(self.minute) * 60;
        let utc = match self.reference {
            TransitionReference::Utc => wall,
            TransitionReference::LocalBefore => wall - i64::from(offset_before_secs),
        };
        UtcInstant::from_unix_secs(utc)
    }

    fn validate(&self) -> Result<(), RuleError> {
        if !(3..=12).contains(&self.month) {
            return Err(RuleError::InvalidMonth { month: self.month });
        }
        // Any year works for the length check: only February varies
        if self.boundary < 7 || self.boundary > days_in_month(2000, self.month) {
            return Err(RuleError::InvalidBoundary {
                boundary: self.boundary,
            });
        }
        if self.hour > 23 || self.minute > 59 {
            return Err(RuleError::InvalidTime {
                hour: self.hour,
                minute: self.minute,
            });
        }
        Ok(())
    }
}

/// A region's DST rule: two offsets and two yearly switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DstRule {
    /// UTC offset outside the daylight period
    pub standard_offset_secs: i32,
    /// UTC offset during the daylight period
    pub daylight_offset_secs: i32,
    pub spring_forward: TransitionSpec,
    pub fall_back: TransitionSpec,
    /// First year the closed form is valid for this region
    pub first_year: u16,
    /// Last year the closed form is valid for this region
    pub last_year: u16,
}

impl DstRule {
    /// Central European Time: CET (UTC+1) / CEST (UTC+2)
    ///
    /// Switches on the last Sundays of March and October at 01:00 UTC.
    pub const CENTRAL_EUROPE: Self = Self {
        standard_offset_secs: 3600,
        daylight_offset_secs: 7200,
        spring_forward: TransitionSpec {
            month: 3,
            boundary: 31,
            offset_constant: 4,
            hour: 1,
            minute: 0,
            reference: TransitionReference::Utc,
        },
        fall_back: TransitionSpec {
            month: 10,
            boundary: 31,
            offset_constant: 1,
            hour: 1,
            minute: 0,
            reference: TransitionReference::Utc,
        },
        first_year: 1996,
        last_year: 2099,
    };

    /// US Eastern Time as legislated for 1987..=2006: EST (UTC-5) / EDT (UTC-4)
    ///
    /// Switches on the first Sunday of April and the last Sunday of October
    /// at 02:00 local time.
    pub const US_EASTERN_1987: Self = Self {
        standard_offset_secs: -5 * 3600,
        daylight_offset_secs: -4 * 3600,
        spring_forward: TransitionSpec {
            month: 4,
            boundary: 7,
            offset_constant: 4,
            hour: 2,
            minute: 0,
            reference: TransitionReference::LocalBefore,
        },
        fall_back: TransitionSpec {
            month: 10,
            boundary: 31,
            offset_constant: 1,
            hour: 2,
            minute: 0,
            reference: TransitionReference::LocalBefore,
        },
        first_year: 1987,
        last_year: 2006,
    };

    /// Check the rule is expressible by the closed form
    pub fn validate(&self) -> Result<(), RuleError> {
        self.spring_forward.validate()?;
        self.fall_back.validate()?;
        if self.first_year > self.last_year {
            return Err(RuleError::EmptyRange);
        }
        if self.first_year <= 1900 || self.last_year >= 2100 {
            return Err(RuleError::YearOutOfRange {
                year: if self.first_year <= 1900 {
                    self.first_year
                } else {
                    self.last_year
                },
            });
        }
        if self.spring_forward.month >= self.fall_back.month {
            return Err(RuleError::Unordered);
        }
        Ok(())
    }

    /// Compute the spring-forward and fall-back instants of `year`
    pub fn transitions(&self, year: u16) -> Result<TransitionPair, RuleError> {
        if year < self.first_year || year > self.last_year {
            return Err(RuleError::YearOutOfRange { year });
        }
        Ok(TransitionPair {
            year,
            spring_forward: self
                .spring_forward
                .instant(year, self.standard_offset_secs),
            fall_back: self.fall_back.instant(year, self.daylight_offset_secs),
        })
    }

    /// UTC offset applied in `regime`
    pub const fn offset_secs(&self, regime: Regime) -> i32 {
        match regime {
            Regime::Daylight => self.daylight_offset_secs,
            Regime::BeforeSpringForward | Regime::AfterFallBack => self.standard_offset_secs,
        }
    }
}

/// One of the three mutually exclusive periods of a year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Regime {
    BeforeSpringForward,
    Daylight,
    AfterFallBack,
}

impl Regime {
    pub const fn is_daylight(self) -> bool {
        matches!(self, Self::Daylight)
    }
}

/// Switch instants for one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransitionPair {
    /// Year these instants were computed for
    pub year: u16,
    pub spring_forward: UtcInstant,
    pub fall_back: UtcInstant,
}

impl TransitionPair {
    /// Classify an instant of this pair's year
    pub fn classify(&self, now: UtcInstant) -> Regime {
        if now < self.spring_forward {
            Regime::BeforeSpringForward
        } else if now < self.fall_back {
            Regime::Daylight
        } else {
            Regime::AfterFallBack
        }
    }
}

/// DST rule errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RuleError {
    /// Year outside the range the closed form is valid for
    YearOutOfRange { year: u16 },
    /// Switch month before March or after December
    InvalidMonth { month: u8 },
    /// Window end that cannot hold a full week in its month
    InvalidBoundary { boundary: u8 },
    /// Switch time of day out of range
    InvalidTime { hour: u8, minute: u8 },
    /// `first_year` after `last_year`
    EmptyRange,
    /// Spring forward not in an earlier month than fall back
    Unordered,
}

impl core::fmt::Display for RuleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::YearOutOfRange { year } => write!(f, "Year {year} outside DST rule range"),
            Self::InvalidMonth { month } => write!(f, "Invalid transition month {month}"),
            Self::InvalidBoundary { boundary } => {
                write!(f, "Invalid transition window end {boundary}")
            }
            Self::InvalidTime { hour, minute } => {
                write!(f, "Invalid transition time {hour:02}:{minute:02}")
            }
            Self::EmptyRange => write!(f, "Empty DST rule year range"),
            Self::Unordered => write!(f, "Spring forward must precede fall back"),
        }
    }
}

impl core::error::Error for RuleError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{civil_from_unix, weekday_from_days};

    const SUNDAY: u8 = 6;

    fn unix(year: i32, month: u8, day: u8, hour: i64, minute: i64) -> UtcInstant {
        UtcInstant::from_unix_secs(
            days_from_civil(year, month, day) * SECONDS_PER_DAY + hour * 3600 + minute * 60,
        )
    }

    #[test]
    fn test_presets_are_valid() {
        assert_eq!(DstRule::CENTRAL_EUROPE.validate(), Ok(()));
        assert_eq!(DstRule::US_EASTERN_1987.validate(), Ok(()));
    }

    #[test]
    fn test_central_europe_2024() {
        let pair = DstRule::CENTRAL_EUROPE.transitions(2024).unwrap();
        assert_eq!(pair.spring_forward, unix(2024, 3, 31, 1, 0));
        assert_eq!(pair.fall_back, unix(2024, 10, 27, 1, 0));
    }

    #[test]
    fn test_us_eastern_local_reference() {
        // 2006-04-02 02:00 EST = 07:00 UTC; 2006-10-29 02:00 EDT = 06:00 UTC
        let pair = DstRule::US_EASTERN_1987.transitions(2006).unwrap();
        assert_eq!(pair.spring_forward, unix(2006, 4, 2, 7, 0));
        assert_eq!(pair.fall_back, unix(2006, 10, 29, 6, 0));
    }

    #[test]
    fn test_switch_days_are_correct_sundays_for_whole_range() {
        for rule in [DstRule::CENTRAL_EUROPE, DstRule::US_EASTERN_1987] {
            for year in rule.first_year..=rule.last_year {
                for switch in [rule.spring_forward, rule.fall_back] {
                    let day = switch.day(year);
                    let days = days_from_civil(i32::from(year), switch.month, day);
                    assert_eq!(weekday_from_days(days), SUNDAY, "{} {}", year, switch.month);
                    // The Sunday sits in the 7-day window ending at `boundary`
                    assert!(day <= switch.boundary && day + 7 > switch.boundary);
                }
            }
        }
    }

    #[test]
    fn test_spring_precedes_fall_within_year() {
        for rule in [DstRule::CENTRAL_EUROPE, DstRule::US_EASTERN_1987] {
            for year in rule.first_year..=rule.last_year {
                let pair = rule.transitions(year).unwrap();
                assert!(pair.spring_forward < pair.fall_back);
                assert_eq!(civil_from_unix(pair.spring_forward.unix_secs()).year, i32::from(year));
                assert_eq!(civil_from_unix(pair.fall_back.unix_secs()).year, i32::from(year));
            }
        }
    }

    #[test]
    fn test_boundary_inclusive_start_exclusive_end() {
        let pair = DstRule::CENTRAL_EUROPE.transitions(2024).unwrap();
        assert_eq!(
            pair.classify(pair.spring_forward.add_secs(-1)),
            Regime::BeforeSpringForward
        );
        assert_eq!(pair.classify(pair.spring_forward), Regime::Daylight);
        assert_eq!(pair.classify(pair.fall_back.add_secs(-1)), Regime::Daylight);
        assert_eq!(pair.classify(pair.fall_back), Regime::AfterFallBack);
    }

    #[test]
    fn test_offsets_across_a_year_boundary() {
        let rule = DstRule::CENTRAL_EUROPE;
        let previous = rule.transitions(2023).unwrap();
        let current = rule.transitions(2024).unwrap();
        // Sample the gap between fall back 2023 and spring forward 2024
        let mut t = previous.fall_back;
        while t < current.spring_forward {
            let pair = rule
                .transitions(civil_from_unix(t.unix_secs()).year as u16)
                .unwrap();
            assert_eq!(rule.offset_secs(pair.classify(t)), 3600);
            t = t.add_secs(6 * 3600 + 17);
        }
        let mut t = current.spring_forward;
        while t < current.fall_back {
            assert_eq!(rule.offset_secs(current.classify(t)), 7200);
            t = t.add_secs(6 * 3600 + 17);
        }
    }

    #[test]
    fn test_year_out_of_range() {
        assert_eq!(
            DstRule::CENTRAL_EUROPE.transitions(1995),
            Err(RuleError::YearOutOfRange { year: 1995 })
        );
        assert_eq!(
            DstRule::CENTRAL_EUROPE.transitions(2100),
            Err(RuleError::YearOutOfRange { year: 2100 })
        );
    }

    #[test]
    fn test_validate_rejects_bad_rules() {
        let mut rule = DstRule::CENTRAL_EUROPE;
        rule.spring_forward.month = 2;
        assert_eq!(rule.validate(), Err(RuleError::InvalidMonth { month: 2 }));

        let mut rule = DstRule::CENTRAL_EUROPE;
        rule.fall_back.boundary = 6;
        assert_eq!(
            rule.validate(),
            Err(RuleError::InvalidBoundary { boundary: 6 })
        );

        let mut rule = DstRule::CENTRAL_EUROPE;
        rule.first_year = 2050;
        rule.last_year = 2040;
        assert_eq!(rule.validate(), Err(RuleError::EmptyRange));

        // November has 30 days
        let mut rule = DstRule::CENTRAL_EUROPE;
        rule.spring_forward.month = 11;
        assert_eq!(
            rule.validate(),
            Err(RuleError::InvalidBoundary { boundary: 31 })
        );
        rule.spring_forward.boundary = 30;
        assert_eq!(rule.validate(), Err(RuleError::Unordered));

        let mut rule = DstRule::CENTRAL_EUROPE;
        rule.spring_forward.month = 10;
        assert_eq!(rule.validate(), Err(RuleError::Unordered));
    }
}
