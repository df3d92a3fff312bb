use crate::config::TransferConfig;
use crate::core_transfer::error::TransferError;
use log::{debug, info};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, MutexGuard};

/// Long-lived datagram endpoint.
///
/// The server binds one instance on the fixed datagram port and hands a
/// clone to every session; the client connects one instance to the server.
/// Transfers go through a [`TransferLease`], so at most one transfer is in
/// flight per endpoint.
#[derive(Debug, Clone)]
pub struct TransferChannel {
    socket: Arc<UdpSocket>,
    lease: Arc<Mutex<()>>,
    settings: Arc<TransferConfig>,
}

/// Exclusive use of a [`TransferChannel`] for the duration of one transfer.
pub struct TransferLease<'a> {
    channel: &'a TransferChannel,
    _guard: MutexGuard<'a, ()>,
}

impl TransferChannel {
    /// Binds the server side of the channel.
    pub async fn bind(addr: SocketAddr, settings: TransferConfig) -> Result<Self, TransferError> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Datagram channel bound on {}", socket.local_addr()?);
        Ok(Self::from_socket(socket, settings))
    }

    /// Binds an ephemeral local port and connects it to `server`.
    pub async fn connect(server: SocketAddr, settings: TransferConfig) -> Result<Self, TransferError> {
        let any: IpAddr = match server {
            SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        let socket = UdpSocket::bind((any, 0)).await?;
        socket.connect(server).await?;
        debug!(
            "Datagram channel {} connected to {}",
            socket.local_addr()?,
            server
        );
        Ok(Self::from_socket(socket, settings))
    }

    pub fn from_socket(socket: UdpSocket, settings: TransferConfig) -> Self {
        Self {
            socket: Arc::new(socket),
            lease: Arc::new(Mutex::new(())),
            settings: Arc::new(settings),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransferError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn settings(&self) -> &TransferConfig {
        &self.settings
    }

    /// Waits until no other transfer uses the channel.
    ///
    /// Datagrams already queued when the lease is granted belong to an
    /// earlier, abandoned exchange and are discarded.
    pub async fn lease(&self) -> TransferLease<'_> {
        let guard = self.lease.lock().await;
        let lease = TransferLease {
            channel: self,
            _guard: guard,
        };
        let stale = lease.drain_stale();
        if stale > 0 {
            debug!("Discarded {} stale datagram(s)", stale);
        }
        lease
    }
}

impl<'a> TransferLease<'a> {
    pub fn socket(&self) -> &UdpSocket {
        &self.channel.socket
    }

    pub fn settings(&self) -> &TransferConfig {
        &self.channel.settings
    }

    fn drain_stale(&self) -> usize {
        let mut buf = vec![0u8; self.settings().datagram_capacity()];
        let mut drained = 0;
        loop {
            match self.channel.socket.try_recv_from(&mut buf) {
                Ok(_) => drained += 1,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                // ICMP errors from an earlier peer surface here on some platforms.
                Err(_) => drained += 1,
            }
            if drained > 4096 {
                break;
            }
        }
        drained
    }
}
