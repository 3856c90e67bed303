#![deny(unsafe_code)]
#![deny(warnings)]
//! Ethernet association through the embassy-net stack
//!
//! The W5500 handles the PHY and DHCP runs inside embassy-net; association
//! means waiting for a DHCP lease, in bounded steps.

use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use embassy_net::Stack;
use embassy_time::Timer;
use hal_abstractions::{LocalAddress, NetworkError, NetworkLink};

use super::config::LinkConfig;

/// [`NetworkLink`] over the W5500 and DHCP
pub struct EthernetLink {
    stack: Stack<'static>,
    config: LinkConfig,
}

impl EthernetLink {
    pub fn new(stack: Stack<'static>, config: LinkConfig) -> Self {
        Self { stack, config }
    }

    fn log_config(&self) -> Option<LocalAddress> {
        let config = self.stack.config_v4()?;
        let octets = config.address.address().octets();
        info!(
            "IP: {}.{}.{}.{}",
            octets[0], octets[1], octets[2], octets[3]
        );

        if let Some(gateway) = config.gateway {
            let gw_octets = gateway.octets();
            info!(
                "Gateway: {}.{}.{}.{}",
                gw_octets[0], gw_octets[1], gw_octets[2], gw_octets[3]
            );
        }
        Some(LocalAddress(octets))
    }
}

impl NetworkLink for EthernetLink {
    async fn connect(&mut self) -> Result<LocalAddress, NetworkError> {
        info!("Waiting for DHCP...");
        for attempt in 1..=self.config.attempts {
            let wait = select(
                self.stack.wait_config_up(),
                Timer::after_millis(self.config.attempt_timeout_ms),
            )
            .await;
            match wait {
                Either::First(()) => {
                    info!("Network is UP!");
                    if let Some(address) = self.log_config() {
                        return Ok(address);
                    }
                }
                Either::Second(()) => warn!(
                    "No DHCP lease yet (attempt {}/{})",
                    attempt, self.config.attempts
                ),
            }
        }

        if !self.stack.is_link_up() {
            warn!("Ethernet link is down");
            return Err(NetworkError::LinkDown);
        }
        Err(NetworkError::AssociationFailed {
            attempts: self.config.attempts,
        })
    }
}
