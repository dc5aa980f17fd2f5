//! Datagram listener feeding the ingestion channel.

use super::{resolve_address, SyslogAddress, TransportError};
use shared::models::LogEnvelope;
use shared::parser::parse_rfc3164;
use shared::registry::IngestionCounters;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

#[cfg(unix)]
use std::path::PathBuf;
#[cfg(unix)]
use tokio::net::UnixDatagram;

/// Largest datagram the listener reads; longer datagrams are truncated by the OS.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

enum Socket {
    Udp(UdpSocket),
    #[cfg(unix)]
    Unix(UnixDatagram, PathBuf),
}

impl Socket {
    async fn recv(&self, buf: &mut [u8]) -> std::io::Result<(usize, Option<String>)> {
        match self {
            Self::Udp(socket) => {
                let (len, peer) = socket.recv_from(buf).await?;
                Ok((len, Some(peer.to_string())))
            }
            #[cfg(unix)]
            Self::Unix(socket, _) => {
                let (len, peer) = socket.recv_from(buf).await?;
                Ok((len, peer.as_pathname().map(|p| p.display().to_string())))
            }
        }
    }
}

/// A bound syslog socket.
///
/// Binding happens in [`SyslogListener::bind`] so that bind failures surface
/// at startup; [`SyslogListener::run`] then forwards envelopes until told to
/// stop.
pub struct SyslogListener {
    socket: Socket,
    address: SyslogAddress,
    counters: IngestionCounters,
}

impl SyslogListener {
    /// Binds the listener.
    ///
    /// A UDP host name is resolved first and the listener binds the first
    /// address it yields. For a Unix socket, a stale socket file left at the
    /// path is removed first. Other kinds of files are left alone and make the bind fail.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Bind` if the address cannot be resolved or
    /// the socket cannot be bound.
    pub async fn bind(
        address: &SyslogAddress,
        counters: IngestionCounters,
    ) -> Result<Self, TransportError> {
        let bind_error = |source| TransportError::Bind {
            address: address.to_string(),
            source,
        };

        let socket = match address {
            SyslogAddress::Udp(addr) => {
                let addr = resolve_address(addr).await.map_err(bind_error)?;
                Socket::Udp(UdpSocket::bind(addr).await.map_err(bind_error)?)
            }
            #[cfg(unix)]
            SyslogAddress::Unix(path) => {
                remove_stale_socket(path).map_err(bind_error)?;
                let socket = UnixDatagram::bind(path).map_err(bind_error)?;
                Socket::Unix(socket, path.clone())
            }
            #[cfg(not(unix))]
            SyslogAddress::Unix(_) => return Err(TransportError::UnixUnsupported),
        };

        tracing::info!(address = %address, "Syslog listener bound");
        Ok(Self {
            socket,
            address: address.clone(),
            counters,
        })
    }

    /// Returns the local address of a UDP listener.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            Socket::Udp(socket) => socket.local_addr().ok(),
            #[cfg(unix)]
            Socket::Unix(..) => None,
        }
    }

    /// Returns the configured address, before any name resolution.
    #[must_use]
    pub fn address(&self) -> &SyslogAddress {
        &self.address
    }

    /// Receives datagrams and forwards them as envelopes until `shutdown`
    /// changes, its sender is dropped, or the channel is closed.
    ///
    /// When the channel is full the listener waits for room instead of
    /// dropping the envelope; meanwhile the kernel socket buffer absorbs new
    /// datagrams. Frames that are not valid RFC 3164 are counted as received
    /// and failed, logged and dropped here.
    pub async fn run(self, tx: mpsc::Sender<LogEnvelope>, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = self.socket.recv(&mut buf) => received,
            };

            let (len, peer) = match received {
                Ok(received) => received,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive syslog datagram");
                    continue;
                }
            };

            let frame = String::from_utf8_lossy(&buf[..len]);
            let envelope = match parse_rfc3164(&frame) {
                Ok(envelope) => envelope,
                Err(e) => {
                    self.counters.record_message();
                    self.counters.record_failure();
                    tracing::warn!(client = ?peer, error = %e, "Dropping unparseable syslog frame");
                    continue;
                }
            };
            let envelope = match peer {
                Some(peer) => envelope.with_client(peer),
                None => envelope,
            };

            if tx.send(envelope).await.is_err() {
                tracing::warn!("Ingestion channel closed, stopping syslog listener");
                break;
            }
        }

        #[cfg(unix)]
        if let Socket::Unix(_, path) = &self.socket {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove syslog socket");
            }
        }

        tracing::info!(address = %self.address, "Syslog listener stopped");
    }
}

#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => std::fs::remove_file(path),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
