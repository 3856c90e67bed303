//! Calendar date/time conversions using O(1) algorithms
//!
//! Implements Howard Hinnant's civil_from_days and days_from_civil algorithms.
//! Reference: http://howardhinnant.github.io/date_algorithms.html
//!
//! Valid for all dates in the proleptic Gregorian calendar; no iteration
//! over years or months.

/// Seconds in one (leap-second free) day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// 1970-01-01 was a Thursday (Monday = 0)
const EPOCH_WEEKDAY: i64 = 3;

/// Broken-down UTC (or offset-adjusted) calendar time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilDateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0..=6, Monday = 0
    pub weekday: u8,
    /// 1..=366
    pub day_of_year: u16,
}

/// Check if year is a leap year (Gregorian calendar)
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1..=12) of `year`
pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// Convert civil date (year, month, day) to days since Unix epoch
pub fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = i64::from(year);
    let m = i64::from(month);
    let d = i64::from(day);

    // Shift so the year starts on March 1 and the leap day is last
    let (y, m) = if m <= 2 { (y - 1, m + 9) } else { (y, m - 3) };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400; // year of era [0, 399]
    let doy = (153 * m + 2) / 5 + d - 1; // day of year [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // day of era [0, 146096]

    era * 146_097 + doe - 719_468 // 719468 = days from 0000-03-01 to 1970-01-01
}

/// Convert days since Unix epoch to civil date (year, month, day)
pub fn civil_from_days(days_since_epoch: i64) -> (i32, u8, u8) {
    let z = days_since_epoch + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0, 399]
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11], March = 0
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = if m <= 2 { y + 1 } else { y };

    (year as i32, m, d)
}

/// Day of week for a day count since the Unix epoch (Monday = 0)
pub fn weekday_from_days(days_since_epoch: i64) -> u8 {
    (days_since_epoch + EPOCH_WEEKDAY).rem_euclid(7) as u8
}

/// Day of year, 1-based
pub fn day_of_year(year: i32, month: u8, day: u8) -> u16 {
    (days_from_civil(year, month, day) - days_from_civil(year, 1, 1) + 1) as u16
}

/// Break epoch seconds into calendar fields
pub fn civil_from_unix(unix_secs: i64) -> CivilDateTime {
    let days = unix_secs.div_euclid(SECONDS_PER_DAY);
    let secs_today = unix_secs.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = civil_from_days(days);

    CivilDateTime {
        year,
        month,
        day,
        hour: (secs_today / 3600) as u8,
        minute: ((secs_today % 3600) / 60) as u8,
        second: (secs_today % 60) as u8,
        weekday: weekday_from_days(days),
        day_of_year: day_of_year(year, month, day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2000)); // Divisible by 400
        assert!(is_leap_year(2024)); // Divisible by 4
        assert!(!is_leap_year(1900)); // Divisible by 100, not 400
        assert!(!is_leap_year(2023)); // Not divisible by 4
        assert!(!is_leap_year(2100)); // Divisible by 100, not 400
    }

    #[test]
    fn test_unix_epoch() {
        let dt = civil_from_unix(0);
        assert_eq!((dt.year, dt.month, dt.day), (1970, 1, 1));
        assert_eq!((dt.hour, dt.minute, dt.second), (0, 0, 0));
        assert_eq!(dt.weekday, 3); // Thursday
        assert_eq!(dt.day_of_year, 1);
    }

    #[test]
    fn test_round_trip_days() {
        for &days in &[-719_468i64, -1, 0, 10_957, 19_723, 47_482, 2_932_896] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days, "days {}", days);
        }
    }

    #[test]
    fn test_leap_day_2024() {
        let days = days_from_civil(2024, 2, 29);
        assert_eq!(civil_from_days(days), (2024, 2, 29));
        assert_eq!(civil_from_days(days + 1), (2024, 3, 1));
        assert_eq!(day_of_year(2024, 12, 31), 366);
        assert_eq!(day_of_year(2023, 12, 31), 365);
    }

    #[test]
    fn test_end_of_century() {
        // 1999-12-31 23:59:59
        let dt = civil_from_unix(946_684_799);
        assert_eq!((dt.year, dt.month, dt.day), (1999, 12, 31));
        assert_eq!((dt.hour, dt.minute, dt.second), (23, 59, 59));
        assert_eq!(dt.weekday, 4); // Friday
    }

    #[test]
    fn test_known_weekdays() {
        // 2024-03-31 was a Sunday, 2024-10-27 too
        assert_eq!(weekday_from_days(days_from_civil(2024, 3, 31)), 6);
        assert_eq!(weekday_from_days(days_from_civil(2024, 10, 27)), 6);
        // 2000-01-01 was a Saturday
        assert_eq!(weekday_from_days(days_from_civil(2000, 1, 1)), 5);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2100, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 10), 31);
    }
}
