use crate::config::Config;
use crate::core_network::network;
use crate::core_sandbox::Sandbox;
use crate::core_transfer::TransferChannel;
use anyhow::{Context, Result};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;

/// Everything a session needs besides its own stream: configuration, the
/// sandbox root, and the shared datagram channel.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub config: Arc<Config>,
    pub sandbox: Arc<Sandbox>,
    pub channel: TransferChannel,
}

impl ServerContext {
    /// Validates the root and binds the datagram channel.
    pub async fn initialize(config: Config) -> Result<Self> {
        let root = config
            .server
            .root_dir
            .clone()
            .context("No root directory configured")?;
        let sandbox = Sandbox::new(&root)
            .with_context(|| format!("Root directory {} is invalid", root.display()))?;

        let udp_addr = bind_addr(&config, config.server.udp_port)?;
        let channel = TransferChannel::bind(udp_addr, config.transfer.clone())
            .await
            .with_context(|| format!("Failed to bind datagram channel on {}", udp_addr))?;

        Ok(Self {
            config: Arc::new(config),
            sandbox: Arc::new(sandbox),
            channel,
        })
    }
}

pub fn bind_addr(config: &Config, port: u16) -> Result<SocketAddr> {
    let ip = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_address))?;
    Ok(SocketAddr::new(ip, port))
}

/// Runs the server until the accept loop fails.
pub async fn run(config: Config) -> Result<()> {
    let context = ServerContext::initialize(config).await?;
    info!("Serving root {:?}", context.sandbox.root());

    match network::start_server(context).await {
        Ok(_) => info!("Server stopped."),
        Err(e) => {
            error!("Server failed: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}
