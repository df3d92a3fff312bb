use crate::config::{Config, TransferMode};
use clap::Parser;
use std::path::PathBuf;

/// Server command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "rouilleudpd",
    about = "A sandboxed file server with a datagram transfer channel."
)]
pub struct ServerCli {
    /// Root directory served to clients
    pub root: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Control channel (TCP) port
    #[arg(long)]
    pub tcp_port: Option<u16>,

    /// Transfer channel (UDP) port
    #[arg(long)]
    pub udp_port: Option<u16>,

    /// Datagram wire mode
    #[arg(long, value_enum)]
    pub mode: Option<TransferMode>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

/// Client command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rouilleudp", about = "Client for the rouilleudpd file server.")]
pub struct ClientCli {
    /// Server host name or IP address
    pub server: Option<String>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Control channel (TCP) port
    #[arg(long)]
    pub tcp_port: Option<u16>,

    /// Transfer channel (UDP) port
    #[arg(long)]
    pub udp_port: Option<u16>,

    /// Datagram wire mode, must match the server
    #[arg(long, value_enum)]
    pub mode: Option<TransferMode>,

    /// Directory where received files are written
    #[arg(short, long)]
    pub download_dir: Option<PathBuf>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerCli {
    /// Command-line values take precedence over the configuration file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.server.root_dir = Some(root.clone());
        }
        if let Some(port) = self.tcp_port {
            config.server.tcp_port = port;
        }
        if let Some(port) = self.udp_port {
            config.server.udp_port = port;
        }
        if let Some(mode) = self.mode {
            config.transfer.mode = mode;
        }
    }
}

impl ClientCli {
    pub fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.client.server_address = server.clone();
        }
        if let Some(port) = self.tcp_port {
            config.server.tcp_port = port;
        }
        if let Some(port) = self.udp_port {
            config.server.udp_port = port;
        }
        if let Some(mode) = self.mode {
            config.transfer.mode = mode;
        }
        if let Some(dir) = &self.download_dir {
            config.client.download_dir = dir.clone();
        }
    }
}
