pub mod config;
pub mod constants;
pub mod core_cli;
pub mod core_client;
pub mod core_command;
pub mod core_network;
pub mod core_sandbox;
pub mod core_transfer;
pub mod helpers;
pub mod server;
pub mod session;

pub use config::Config;
