use crate::config::TransferMode;
use crate::core_transfer::channel::TransferLease;
use crate::core_transfer::error::TransferError;
use crate::core_transfer::frame::Frame;
use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    pub bytes_received: u64,
    pub datagrams: u32,
    /// Length announced by the END frame (framed mode only).
    pub expected_len: Option<u64>,
    /// Datagrams that were malformed or belonged to another transfer.
    pub dropped: u32,
    /// Sequence numbers never received (framed mode only).
    pub gaps: u32,
    /// DATA frames that arrived after a higher sequence number. Their
    /// payload is still appended where it arrived.
    pub out_of_order: u32,
    /// Framed: END seen and byte count matches. Compat: always true once
    /// the receive timeout fired.
    pub complete: bool,
}

/// Runs the receiver role: send the handshake, then append every payload to
/// `sink` in arrival order until the transfer completes.
///
/// In framed mode the handshake is a HELLO naming a fresh transfer id, and
/// only frames carrying that id are accepted.
///
/// The lease must belong to a channel connected to the sender.
pub async fn receive_file<W: AsyncWrite + Unpin>(
    lease: &TransferLease<'_>,
    sink: &mut W,
) -> Result<ReceiveReport, TransferError> {
    let settings = lease.settings();
    let socket = lease.socket();

    let transfer_id: u32 = rand::random();
    let handshake = match settings.mode {
        TransferMode::Framed => Frame::Hello { transfer_id }.to_bytes(),
        TransferMode::Compat => socket.local_addr()?.to_string().into_bytes(),
    };
    socket.send(&handshake).await?;
    debug!("Handshake sent from {}", socket.local_addr()?);

    let mut buf = vec![0u8; settings.datagram_capacity()];
    let mut report = ReceiveReport::default();
    let mut next_seq = 0u32;

    loop {
        let n = match timeout(settings.receive_timeout(), socket.recv(&mut buf)).await {
            Ok(received) => received?,
            Err(_) => {
                if settings.mode == TransferMode::Compat {
                    report.complete = true;
                } else {
                    warn!(
                        "Receive timed out after {} bytes without END frame",
                        report.bytes_received
                    );
                }
                break;
            }
        };

        if settings.mode == TransferMode::Compat {
            sink.write_all(&buf[..n]).await?;
            report.bytes_received += n as u64;
            report.datagrams += 1;
            continue;
        }

        let frame = match Frame::decode(&buf[..n]) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Dropping datagram: {}", e);
                report.dropped += 1;
                continue;
            }
        };

        if frame.transfer_id() != transfer_id {
            report.dropped += 1;
            continue;
        }

        match frame {
            Frame::Data { seq, payload, .. } => {
                if seq >= next_seq {
                    report.gaps = report.gaps.saturating_add(seq - next_seq);
                    next_seq = seq.wrapping_add(1);
                } else {
                    report.out_of_order += 1;
                    report.gaps = report.gaps.saturating_sub(1);
                }
                sink.write_all(payload).await?;
                report.bytes_received += payload.len() as u64;
                report.datagrams += 1;
            }
            Frame::Hello { .. } => report.dropped += 1,
            Frame::End { seq, total_len, .. } => {
                report.gaps = report.gaps.saturating_add(seq.saturating_sub(next_seq));
                report.expected_len = Some(total_len);
                report.complete = total_len == report.bytes_received && seq == report.datagrams;
                if !report.complete {
                    warn!(
                        "Transfer ended with {}/{} bytes in {}/{} datagrams",
                        report.bytes_received, total_len, report.datagrams, seq
                    );
                }
                break;
            }
        }
    }

    sink.flush().await?;
    Ok(report)
}
