// Loopback tests for the datagram transfer

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::{TransferConfig, TransferMode};
    use crate::core_transfer::frame::Frame;
    use std::net::SocketAddr;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::UdpSocket;
    use tokio::task::JoinHandle;

    fn settings(mode: TransferMode) -> TransferConfig {
        TransferConfig {
            mode,
            chunk_size: 1024,
            chunk_delay_ms: 1,
            receive_timeout_ms: 500,
            handshake_timeout_ms: 5_000,
        }
    }

    async fn pair(mode: TransferMode) -> (TransferChannel, TransferChannel) {
        let loopback: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = TransferChannel::bind(loopback, settings(mode)).await.unwrap();
        let client = TransferChannel::connect(server.local_addr().unwrap(), settings(mode))
            .await
            .unwrap();
        (server, client)
    }

    fn request_for(dir: &Path, name: &str, contents: &[u8]) -> TransferRequest {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        TransferRequest {
            file_name: name.to_string(),
            path,
            size: contents.len() as u64,
        }
    }

    async fn run_transfer(
        server: &TransferChannel,
        client: &TransferChannel,
        request: &TransferRequest,
    ) -> (SendReport, ReceiveReport, Vec<u8>) {
        let lease = server.lease().await;
        let (sent, received) = tokio::join!(send_file(&lease, request), async {
            let lease = client.lease().await;
            let mut out = Vec::new();
            let report = receive_file(&lease, &mut out).await;
            (report, out)
        });
        let (report, out) = received;
        (sent.unwrap(), report.unwrap(), out)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_framed_transfer_is_exact() {
        let dir = TempDir::new().unwrap();
        let contents = pattern(2500);
        let request = request_for(dir.path(), "blob.bin", &contents);
        let (server, client) = pair(TransferMode::Framed).await;

        let (sent, received, out) = run_transfer(&server, &client, &request).await;

        assert_eq!(sent.bytes_sent, 2500);
        assert_eq!(sent.datagrams, 3);
        assert_eq!(sent.peer.port(), client.local_addr().unwrap().port());
        assert!(received.complete);
        assert_eq!(received.expected_len, Some(2500));
        assert_eq!(received.datagrams, 3);
        assert_eq!(out, contents);
    }

    #[tokio::test]
    async fn test_compat_transfer_has_no_trailing_padding() {
        let dir = TempDir::new().unwrap();
        let contents = pattern(1500);
        let request = request_for(dir.path(), "odd.bin", &contents);
        let (server, client) = pair(TransferMode::Compat).await;

        let (sent, received, out) = run_transfer(&server, &client, &request).await;

        assert_eq!(sent.datagrams, 2);
        assert!(received.complete);
        assert_eq!(received.expected_len, None);
        assert_eq!(out.len(), 1500);
        assert_eq!(out, contents);
    }

    #[tokio::test]
    async fn test_empty_file_completes_on_end_frame() {
        let dir = TempDir::new().unwrap();
        let request = request_for(dir.path(), "empty", b"");
        let (server, client) = pair(TransferMode::Framed).await;

        let (sent, received, out) = run_transfer(&server, &client, &request).await;

        assert_eq!(sent.datagrams, 0);
        assert!(received.complete);
        assert_eq!(received.expected_len, Some(0));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_hello() {
        let dir = TempDir::new().unwrap();
        let request = request_for(dir.path(), "a.txt", b"hello");
        let (server, client) = pair(TransferMode::Framed).await;

        let (_, received, out) = run_transfer(&server, &client, &request).await;

        assert!(received.complete);
        assert_eq!(&out[..5], b"hello");
    }

    #[tokio::test]
    async fn test_sender_gives_up_without_handshake() {
        let dir = TempDir::new().unwrap();
        let request = request_for(dir.path(), "a.txt", b"hello");
        let mut quick = settings(TransferMode::Framed);
        quick.handshake_timeout_ms = 100;
        let server = TransferChannel::bind("127.0.0.1:0".parse().unwrap(), quick)
            .await
            .unwrap();

        let lease = server.lease().await;
        let err = send_file(&lease, &request).await.unwrap_err();
        assert!(matches!(err, TransferError::HandshakeTimeout(_)));
    }

    #[tokio::test]
    async fn test_silent_sender_is_incomplete_in_framed_mode() {
        let (_server, client) = pair(TransferMode::Framed).await;
        let lease = client.lease().await;
        let mut out = Vec::new();
        let report = receive_file(&lease, &mut out).await.unwrap();
        assert!(!report.complete);
        assert_eq!(report.bytes_received, 0);
    }

    #[tokio::test]
    async fn test_silent_sender_counts_as_done_in_compat_mode() {
        let (_server, client) = pair(TransferMode::Compat).await;
        let lease = client.lease().await;
        let mut out = Vec::new();
        let report = receive_file(&lease, &mut out).await.unwrap();
        assert!(report.complete);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_stale_handshake_is_discarded_on_lease() {
        let dir = TempDir::new().unwrap();
        let request = request_for(dir.path(), "a.txt", b"hello");
        let (server, client) = pair(TransferMode::Framed).await;

        // A handshake nobody waited for, e.g. from an abandoned transfer.
        let stray = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        stray
            .send_to(b"late", server.local_addr().unwrap())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (sent, received, out) = run_transfer(&server, &client, &request).await;
        assert_eq!(sent.peer.port(), client.local_addr().unwrap().port());
        assert!(received.complete);
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_lease_is_exclusive() {
        let (server, _client) = pair(TransferMode::Framed).await;
        let first = server.lease().await;
        let second = tokio::time::timeout(Duration::from_millis(100), server.lease()).await;
        assert!(second.is_err());
        drop(first);
        let third = tokio::time::timeout(Duration::from_millis(100), server.lease()).await;
        assert!(third.is_ok());
    }

    /// Starts a framed receiver towards a bare socket and returns that
    /// socket, the receiver's address and the id from its HELLO.
    async fn manual_sender() -> (UdpSocket, SocketAddr, u32, JoinHandle<(ReceiveReport, Vec<u8>)>) {
        let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = TransferChannel::connect(raw.local_addr().unwrap(), settings(TransferMode::Framed))
            .await
            .unwrap();
        let receiver = tokio::spawn(async move {
            let lease = client.lease().await;
            let mut out = Vec::new();
            let report = receive_file(&lease, &mut out).await.unwrap();
            (report, out)
        });

        let mut buf = [0u8; 64];
        let (n, peer) = raw.recv_from(&mut buf).await.unwrap();
        let transfer_id = match Frame::decode(&buf[..n]).unwrap() {
            Frame::Hello { transfer_id } => transfer_id,
            other => panic!("expected HELLO, got {:?}", other),
        };
        (raw, peer, transfer_id, receiver)
    }

    async fn send_frames(raw: &UdpSocket, peer: SocketAddr, frames: &[Frame<'_>]) {
        for frame in frames {
            raw.send_to(&frame.to_bytes(), peer).await.unwrap();
        }
    }

    fn data(transfer_id: u32, seq: u32, payload: &[u8]) -> Frame<'_> {
        Frame::Data {
            transfer_id,
            seq,
            payload,
        }
    }

    #[tokio::test]
    async fn test_skipped_seq_is_counted_as_gap() {
        let (raw, peer, id, receiver) = manual_sender().await;
        send_frames(
            &raw,
            peer,
            &[
                data(id, 0, b"ab"),
                data(id, 2, b"ef"),
                Frame::End {
                    transfer_id: id,
                    seq: 3,
                    total_len: 6,
                },
            ],
        )
        .await;

        let (report, out) = receiver.await.unwrap();
        assert_eq!(report.gaps, 1);
        assert_eq!(report.out_of_order, 0);
        assert_eq!(report.bytes_received, 4);
        assert!(!report.complete);
        assert_eq!(out, b"abef");
    }

    #[tokio::test]
    async fn test_late_frame_fills_gap_and_counts_out_of_order() {
        let (raw, peer, id, receiver) = manual_sender().await;
        send_frames(
            &raw,
            peer,
            &[
                data(id, 0, b"ab"),
                data(id, 2, b"ef"),
                data(id, 1, b"cd"),
                Frame::End {
                    transfer_id: id,
                    seq: 3,
                    total_len: 6,
                },
            ],
        )
        .await;

        let (report, out) = receiver.await.unwrap();
        assert_eq!(report.gaps, 0);
        assert_eq!(report.out_of_order, 1);
        assert!(report.complete);
        assert_eq!(out, b"abefcd");
    }

    #[tokio::test]
    async fn test_lost_trailing_frame_is_counted_at_end() {
        let (raw, peer, id, receiver) = manual_sender().await;
        send_frames(
            &raw,
            peer,
            &[
                data(id, 0, b"ab"),
                Frame::End {
                    transfer_id: id,
                    seq: 2,
                    total_len: 4,
                },
            ],
        )
        .await;

        let (report, _) = receiver.await.unwrap();
        assert_eq!(report.gaps, 1);
        assert!(!report.complete);
    }

    #[tokio::test]
    async fn test_frames_of_earlier_transfer_do_not_capture_receiver() {
        let (raw, peer, id, receiver) = manual_sender().await;
        let stale = id.wrapping_add(1);
        send_frames(
            &raw,
            peer,
            &[
                data(stale, 5, b"zz"),
                Frame::End {
                    transfer_id: stale,
                    seq: 6,
                    total_len: 12,
                },
                data(id, 0, b"ok"),
                Frame::End {
                    transfer_id: id,
                    seq: 1,
                    total_len: 2,
                },
            ],
        )
        .await;

        let (report, out) = receiver.await.unwrap();
        assert_eq!(report.dropped, 2);
        assert!(report.complete);
        assert_eq!(out, b"ok");
    }

    #[tokio::test]
    async fn test_sender_uses_id_from_hello() {
        let dir = TempDir::new().unwrap();
        let request = request_for(dir.path(), "a.txt", b"hello");
        let server = TransferChannel::bind("127.0.0.1:0".parse().unwrap(), settings(TransferMode::Framed))
            .await
            .unwrap();
        let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let lease = server.lease().await;
        raw.send_to(
            &Frame::Hello { transfer_id: 77 }.to_bytes(),
            server.local_addr().unwrap(),
        )
        .await
        .unwrap();
        send_file(&lease, &request).await.unwrap();

        let mut buf = [0u8; 64];
        let n = raw.recv(&mut buf).await.unwrap();
        assert_eq!(Frame::decode(&buf[..n]).unwrap().transfer_id(), 77);
    }
}
