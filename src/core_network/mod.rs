// Control-channel acceptor and session workers
pub mod network;
