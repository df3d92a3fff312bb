use crate::config::TransferMode;
use crate::core_transfer::channel::TransferLease;
use crate::core_transfer::error::TransferError;
use crate::core_transfer::frame::{write_data_header, Frame, HEADER_LEN};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{sleep, timeout};

/// A validated `get`: the file exists, is regular, and lies inside the root.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub peer: SocketAddr,
    pub bytes_sent: u64,
    pub datagrams: u32,
}

/// What the receiver's handshake told the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    /// Source address of the handshake; every datagram goes there.
    pub peer: SocketAddr,
    /// Id announced by a framed-mode HELLO. `None` in compat mode, where the
    /// payload is not interpreted.
    pub transfer_id: Option<u32>,
}

/// Blocks until the receiver's handshake datagram arrives.
pub async fn await_handshake(lease: &TransferLease<'_>) -> Result<Handshake, TransferError> {
    let wait = lease.settings().handshake_timeout();
    let mut buf = vec![0u8; lease.settings().datagram_capacity()];

    let (n, peer) = timeout(wait, lease.socket().recv_from(&mut buf))
        .await
        .map_err(|_| TransferError::HandshakeTimeout(wait))??;

    let transfer_id = match lease.settings().mode {
        TransferMode::Compat => None,
        TransferMode::Framed => match Frame::decode(&buf[..n]) {
            Ok(Frame::Hello { transfer_id }) => Some(transfer_id),
            _ => {
                warn!("Handshake from {} carries no transfer id", peer);
                None
            }
        },
    };
    debug!("Handshake from {} (transfer id {:?})", peer, transfer_id);

    Ok(Handshake { peer, transfer_id })
}

/// Runs the sender role for one request: handshake, then stream the file.
pub async fn send_file(
    lease: &TransferLease<'_>,
    request: &TransferRequest,
) -> Result<SendReport, TransferError> {
    let handshake = await_handshake(lease).await?;
    info!(
        "Sending {:?} ({} bytes) to {}",
        request.path, request.size, handshake.peer
    );

    let mut file = File::open(&request.path).await?;
    let transfer_id = handshake.transfer_id.unwrap_or_else(rand::random::<u32>);
    let report = stream_to(lease, &mut file, handshake.peer, transfer_id).await?;

    info!(
        "Transfer of {} complete: {} bytes in {} datagrams",
        request.file_name, report.bytes_sent, report.datagrams
    );
    Ok(report)
}

/// Emits `source` to `peer` one chunk per datagram, pacing with the
/// configured delay. Only the bytes actually read are sent. `transfer_id`
/// is only written in framed mode.
pub async fn stream_to<R: AsyncRead + Unpin>(
    lease: &TransferLease<'_>,
    source: &mut R,
    peer: SocketAddr,
    transfer_id: u32,
) -> Result<SendReport, TransferError> {
    let settings = lease.settings();
    let framed = settings.mode == TransferMode::Framed;
    let offset = if framed { HEADER_LEN } else { 0 };

    let mut buf = vec![0u8; offset + settings.chunk_size];
    let mut bytes_sent = 0u64;
    let mut seq = 0u32;

    loop {
        let n = read_chunk(source, &mut buf[offset..]).await?;
        if n == 0 {
            break;
        }
        if framed {
            write_data_header(&mut buf, transfer_id, seq);
        }
        lease.socket().send_to(&buf[..offset + n], peer).await?;

        bytes_sent += n as u64;
        seq += 1;
        sleep(settings.chunk_delay()).await;
    }

    if framed {
        let end = Frame::End {
            transfer_id,
            seq,
            total_len: bytes_sent,
        };
        lease.socket().send_to(&end.to_bytes(), peer).await?;
    }

    Ok(SendReport {
        peer,
        bytes_sent,
        datagrams: seq,
    })
}

/// Fills `buf` unless the source ends first; returns the byte count.
async fn read_chunk<R: AsyncRead + Unpin>(
    source: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
