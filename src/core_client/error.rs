use crate::core_transfer::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Could not connect to {addr} after {attempts} attempts: {source}")]
    ConnectFailed {
        addr: String,
        attempts: u32,
        source: std::io::Error,
    },

    #[error("Server closed the connection")]
    Disconnected,

    #[error("Control channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}
