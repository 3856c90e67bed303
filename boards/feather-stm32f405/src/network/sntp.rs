#![deny(unsafe_code)]
#![deny(warnings)]
//! SNTP client implementing NetworkTime
//!
//! One request per configured server, in order, until one answers. No
//! delays between servers: the clock applies its own backoff on timeouts.

use defmt::{info, warn, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, Instant, Timer};
use hal_abstractions::{NetworkTime, TransportError, UtcInstant};

use super::config::SntpConfig;

const NTP_PORT: u16 = 123;
const NTP_PACKET_LEN: usize = 48;

/// SNTP client for time synchronization
pub struct SntpClient {
    stack: Stack<'static>,
    config: SntpConfig,
}

impl SntpClient {
    pub fn new(stack: Stack<'static>, config: SntpConfig) -> Self {
        Self { stack, config }
    }

    async fn sntp_request(&self, server: &str) -> Result<UtcInstant, TransportError> {
        let server_ip = self
            .stack
            .dns_query(server, DnsQueryType::A)
            .await
            .map_err(|_| TransportError::Dns)?
            .first()
            .copied()
            .ok_or(TransportError::Dns)?;

        let server_endpoint = IpEndpoint::new(server_ip, NTP_PORT);
        info!("Resolved {} to {}", server, Debug2Format(&server_endpoint));

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 64];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; 64];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| TransportError::Socket)?;

        // NTP request: LI=0, VN=3, Mode=3 (Client)
        let mut ntp_packet = [0u8; NTP_PACKET_LEN];
        ntp_packet[0] = 0x1B;
        let transmit_time = Instant::now();
        socket
            .send_to(&ntp_packet, server_endpoint)
            .await
            .map_err(|_| TransportError::Socket)?;

        let mut response = [0u8; NTP_PACKET_LEN];
        let timeout_future = Timer::after(Duration::from_millis(self.config.timeout_ms));
        let recv_future = socket.recv_from(&mut response);
        let (recv_len, from_addr) =
            match embassy_futures::select::select(timeout_future, recv_future).await {
                embassy_futures::select::Either::First(_) => return Err(TransportError::Timeout),
                embassy_futures::select::Either::Second(result) => {
                    result.map_err(|_| TransportError::Socket)?
                }
            };
        let receive_time = Instant::now();

        if recv_len < NTP_PACKET_LEN || from_addr.endpoint.addr != server_ip {
            return Err(TransportError::InvalidResponse);
        }

        let stratum = response[1];
        info!("NTP server stratum: {}", stratum);

        if stratum == 0 || stratum > self.config.max_stratum {
            warn!(
                "Invalid stratum {} (max {})",
                stratum, self.config.max_stratum
            );
            return Err(TransportError::InvalidStratum);
        }

        let tx_timestamp_secs =
            u32::from_be_bytes([response[40], response[41], response[42], response[43]]);
        let tx_timestamp_frac =
            u32::from_be_bytes([response[44], response[45], response[46], response[47]]);

        let rtt = receive_time.duration_since(transmit_time);
        let rtt_correction_micros = rtt.as_micros() / 2;
        let (secs, frac) = add_micros(tx_timestamp_secs, tx_timestamp_frac, rtt_correction_micros);

        let instant = UtcInstant::from_ntp(secs, frac);
        info!(
            "NTP time: {} UTC (RTT correction: {} µs)",
            instant.unix_secs(),
            rtt_correction_micros
        );
        Ok(instant)
    }
}

/// Add a microsecond correction to an NTP (seconds, 2^-32 fraction) pair
fn add_micros(secs: u32, frac: u32, micros: u64) -> (u32, u32) {
    let total = u64::from(frac) + (micros << 32) / 1_000_000;
    (secs.wrapping_add((total >> 32) as u32), total as u32)
}

impl NetworkTime for SntpClient {
    async fn fetch_utc_instant(&mut self) -> Result<UtcInstant, TransportError> {
        let mut last_error = TransportError::Dns;
        for server in self.config.servers {
            info!("Requesting time from {}", server);
            match self.sntp_request(server).await {
                Ok(instant) => return Ok(instant),
                Err(e) => {
                    warn!("SNTP request to {} failed: {}", server, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
