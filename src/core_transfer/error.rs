use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Datagram channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No handshake received within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Malformed datagram: {0}")]
    MalformedFrame(String),
}
