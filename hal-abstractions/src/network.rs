//! Network association and NTP exchange collaborators

use core::future::Future;

use crate::time::UtcInstant;

/// IPv4 address assigned to the clock after association
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalAddress(pub [u8; 4]);

impl core::fmt::Display for LocalAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// Network association errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkError {
    /// Physical link is down
    LinkDown,
    /// No address obtained within the configured number of attempts
    AssociationFailed {
        /// Attempts made before giving up
        attempts: u8,
    },
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LinkDown => write!(f, "Link down"),
            Self::AssociationFailed { attempts } => {
                write!(f, "Network association failed after {attempts} attempts")
            }
        }
    }
}

impl core::error::Error for NetworkError {}

/// NTP request/response errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// DNS resolution failed
    Dns,
    /// Socket bind/send/receive error
    Socket,
    /// No response within the request timeout
    Timeout,
    /// Malformed or unexpected response
    InvalidResponse,
    /// Server stratum outside the accepted range
    InvalidStratum,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dns => write!(f, "DNS resolution failed"),
            Self::Socket => write!(f, "Socket error"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::InvalidResponse => write!(f, "Invalid response"),
            Self::InvalidStratum => write!(f, "Invalid stratum"),
        }
    }
}

impl core::error::Error for TransportError {}

impl embedded_io_async::Error for TransportError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::Socket => embedded_io_async::ErrorKind::BrokenPipe,
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            Self::InvalidResponse | Self::InvalidStratum => {
                embedded_io_async::ErrorKind::InvalidData
            }
            Self::Dns => embedded_io_async::ErrorKind::Other,
        }
    }
}

/// Network association (link up and address assigned)
///
/// Implementors own their credentials and make a bounded number of
/// attempts, failing with [`NetworkError::AssociationFailed`] once they
/// are exhausted. They never retry forever.
pub trait NetworkLink {
    /// Associate with the network and return the assigned address
    fn connect(&mut self) -> impl Future<Output = Result<LocalAddress, NetworkError>>;
}

/// One NTP round trip
pub trait NetworkTime {
    /// Fetch the current UTC time from the network
    ///
    /// Implementors distinguish [`TransportError::Timeout`] from other
    /// failures; the clock applies a backoff only for timeouts.
    fn fetch_utc_instant(&mut self) -> impl Future<Output = Result<UtcInstant, TransportError>>;
}
