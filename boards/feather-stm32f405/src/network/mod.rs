#![deny(warnings)]
//! Network collaborators of the clock
//!
//! - **`config`**: Configuration structs with `Default` implementations
//! - **`link`**: DHCP association implementing `NetworkLink`
//! - **`sntp`**: SNTP client implementing `NetworkTime`
//!
//! Both hold a copy of the embassy-net `Stack` handle, which is `!Send`:
//! they are constructed and used inside the network task only.

pub mod config;
pub mod link;
pub mod sntp;

pub use config::{LinkConfig, NetworkConfig, SntpConfig};
pub use link::EthernetLink;
pub use sntp::SntpClient;
