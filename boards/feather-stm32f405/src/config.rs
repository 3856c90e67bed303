#![deny(unsafe_code)]
#![deny(warnings)]
//! Compile-time configuration of this clock

use clock_core::{
    ClockConfig, DisplayConfig, DstRule, LoopConfig, TriggerAction, TriggerRule,
};

use crate::door;
use crate::network::{LinkConfig, NetworkConfig, SntpConfig};

/// Display refresh rate; six positions give 100 full frames per second
pub const DISPLAY_REFRESH_HZ: u32 = 600;

pub const CLOCK: ClockConfig = ClockConfig {
    rule: DstRule::CENTRAL_EUROPE,
    timeout_backoff_ms: 5000,
};

pub const DISPLAY: DisplayConfig<6> = DisplayConfig::SIX_DIGIT;

pub const LOOP: LoopConfig = LoopConfig {
    poll_interval_ms: 20,
    startup_retry_ms: 10_000,
    resync_retry_ms: 60_000,
};

pub const SNTP: SntpConfig = SntpConfig::EUROPE;

pub const LINK: LinkConfig = LinkConfig {
    attempts: 10,
    attempt_timeout_ms: 5000,
};

pub const NETWORK: NetworkConfig = NetworkConfig {
    mac_addr: [0x02, 0x00, 0x00, 0x12, 0x34, 0x56],
    seed: 0x1234_5678_u64,
};

/// Rule capacity of the scheduler
pub const MAX_RULES: usize = 4;

/// Daily schedule, local time
pub const RULES: [TriggerRule; 3] = [
    TriggerRule::new(7, 45, 0, TriggerAction::Invoke(door::OPEN)),
    TriggerRule::new(8, 15, 0, TriggerAction::Resync),
    TriggerRule::new(17, 45, 0, TriggerAction::Invoke(door::CLOSE)),
];
