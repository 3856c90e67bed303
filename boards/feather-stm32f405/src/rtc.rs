#![deny(unsafe_code)]
#![deny(warnings)]
//! Internal RTC (LSE, 32.768 kHz) as the clock's RTC collaborator
//!
//! The RTC holds local wall-clock time. It is written after every
//! successful sync and never read back: the monotonic anchor in the clock
//! carries time between syncs.

use defmt::{error, info, Debug2Format};
use embassy_stm32::rtc::{DateTime, DayOfWeek, Rtc};
use hal_abstractions::{RtcDateTime, RtcWriter};

/// Writes synchronized local time to the STM32 RTC
pub struct HardwareRtc {
    rtc: Rtc,
}

impl HardwareRtc {
    pub fn new(rtc: Rtc) -> Self {
        Self { rtc }
    }
}

/// Map the 1..=7 (Monday = 1) weekday to the RTC enum
fn day_of_week(weekday: u8) -> DayOfWeek {
    match weekday {
        1 => DayOfWeek::Monday,
        2 => DayOfWeek::Tuesday,
        3 => DayOfWeek::Wednesday,
        4 => DayOfWeek::Thursday,
        5 => DayOfWeek::Friday,
        6 => DayOfWeek::Saturday,
        _ => DayOfWeek::Sunday,
    }
}

impl RtcWriter for HardwareRtc {
    fn write_rtc(&mut self, datetime: RtcDateTime) {
        let converted = DateTime::from(
            datetime.year,
            datetime.month,
            datetime.day,
            day_of_week(datetime.weekday),
            datetime.hour,
            datetime.minute,
            datetime.second,
            0,
        );
        let converted = match converted {
            Ok(converted) => converted,
            Err(e) => {
                error!("Invalid RTC date {}: {}", datetime, Debug2Format(&e));
                return;
            }
        };
        match self.rtc.set_datetime(converted) {
            Ok(()) => info!("RTC set to {}", datetime),
            Err(e) => error!("RTC write failed: {}", Debug2Format(&e)),
        }
    }
}
