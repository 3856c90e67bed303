//! Hardware RTC write collaborator

/// Calendar fields written to the hardware RTC
///
/// Carries local wall-clock time. `weekday` follows the RTC convention
/// 1..=7 with Monday = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Hardware RTC writer
///
/// Fire-and-forget: implementations log their own hardware errors.
pub trait RtcWriter {
    fn write_rtc(&mut self, datetime: RtcDateTime);
}
