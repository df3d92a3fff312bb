// Interactive client: control connection, reply blocks, receiver side of `get`

pub mod client;
pub mod error;

pub use client::{connect_with_retry, read_reply_block, Download, Exchange, FileClient};
pub use error::ClientError;
