#![deny(unsafe_code)]
#![deny(warnings)]
//! RTIC TIM2 monotonic as the clock's timebase

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::Timebase;
use rtic_monotonics::fugit::ExtU64;
use rtic_monotonics::Monotonic;

use crate::Mono;

/// 1 MHz TIM2 monotonic: one tick per microsecond
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoTimebase;

impl DelayNs for MonoTimebase {
    async fn delay_ns(&mut self, ns: u32) {
        Mono::delay(u64::from(ns.div_ceil(1000)).micros()).await;
    }

    async fn delay_us(&mut self, us: u32) {
        Mono::delay(u64::from(us).micros()).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        Mono::delay(u64::from(ms).millis()).await;
    }
}

impl Timebase for MonoTimebase {
    fn now_micros(&self) -> u64 {
        Mono::now().ticks()
    }
}
