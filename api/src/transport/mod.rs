//! Syslog transport.
//!
//! Receives RFC 3164 datagrams from nginx over UDP or a Unix datagram socket
//! and hands typed envelopes to the ingestion loop through a bounded channel.

mod listener;

pub use listener::{SyslogListener, MAX_DATAGRAM_SIZE};

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by the syslog transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured address could not be parsed.
    #[error("Invalid syslog address '{0}'")]
    InvalidAddress(String),

    /// Unix datagram sockets are not available on this platform.
    #[error("Unix datagram sockets are not supported on this platform")]
    UnixUnsupported,

    /// The socket could not be bound.
    #[error("Failed to bind syslog listener on {address}: {source}")]
    Bind {
        /// The address that failed to bind.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Where the syslog listener receives messages.
///
/// `unix:<path>` selects a Unix datagram socket; anything else is a UDP
/// `host:port` address, where a leading `:` (as in `:9514`) means all
/// interfaces. Host names are resolved when the listener binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyslogAddress {
    /// UDP `host:port` address.
    Udp(String),
    /// Path of a Unix datagram socket.
    Unix(PathBuf),
}

impl FromStr for SyslogAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(TransportError::InvalidAddress(s.to_string()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        normalize_address(s)
            .map(Self::Udp)
            .ok_or_else(|| TransportError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for SyslogAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp(addr) => write!(f, "udp://{addr}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

impl Default for SyslogAddress {
    fn default() -> Self {
        Self::Udp("0.0.0.0:9514".to_string())
    }
}

/// Checks the syntax of a `host:port` address and expands the `:port`
/// shorthand to all interfaces.
///
/// The host may be an IP literal (IPv6 in brackets) or a name; names are not
/// resolved here. Returns `None` if the address has no valid port or the host
/// is malformed.
#[must_use]
pub fn normalize_address(s: &str) -> Option<String> {
    let (host, port) = s.rsplit_once(':')?;
    port.parse::<u16>().ok()?;

    if host.is_empty() {
        return Some(format!("0.0.0.0:{port}"));
    }
    let bracketed = host.starts_with('[') && host.ends_with(']');
    if host.contains(char::is_whitespace) || (host.contains(':') && !bracketed) {
        return None;
    }
    Some(s.to_string())
}

/// Resolves a normalized `host:port` address to the first socket address it
/// names.
///
/// # Errors
///
/// Returns an error if the lookup fails or yields no address.
pub async fn resolve_address(address: &str) -> std::io::Result<SocketAddr> {
    let resolved = tokio::net::lookup_host(address).await?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("'{address}' did not resolve to any address"),
        )
    })?;

    tracing::debug!(address, resolved = %resolved, "Resolved address");
    Ok(resolved)
}
