// Bulk file transfer over the datagram channel: handshake, chunked send, receive.

pub mod channel;
pub mod error;
pub mod frame;
pub mod receiver;
pub mod sender;

#[cfg(test)]
mod test_transfer;

pub use channel::{TransferChannel, TransferLease};
pub use error::TransferError;
pub use receiver::{receive_file, ReceiveReport};
pub use sender::{send_file, Handshake, SendReport, TransferRequest};
