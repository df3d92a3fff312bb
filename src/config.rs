use crate::constants::{
    CHUNK_DELAY, CONNECT_BACKOFF, CONNECT_RETRIES, DEFAULT_BIND_ADDRESS, DEFAULT_TCP_PORT,
    DEFAULT_UDP_PORT, HANDSHAKE_TIMEOUT, MAX_BUFFER_SIZE, MAX_DATAGRAM_PAYLOAD,
    POOL_SIZE_MULTIPLIER, RECEIVE_TIMEOUT,
};
use crate::core_transfer::frame::HEADER_LEN;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Wire layout of the datagrams exchanged during a `get`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Header with transfer id and sequence number, explicit END datagram.
    #[default]
    Framed,
    /// Raw payloads, completion on receive timeout.
    Compat,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub tcp_port: u16,
    pub udp_port: u16,
    pub bind_address: String,
    pub root_dir: Option<PathBuf>,
    pub pool_multiplier: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    pub mode: TransferMode,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub receive_timeout_ms: u64,
    pub handshake_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_address: String,
    pub connect_retries: u32,
    pub connect_backoff_ms: u64,
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub transfer: TransferConfig,
    pub client: ClientConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp_port: DEFAULT_TCP_PORT,
            udp_port: DEFAULT_UDP_PORT,
            bind_address: String::from(DEFAULT_BIND_ADDRESS),
            root_dir: None,
            pool_multiplier: POOL_SIZE_MULTIPLIER,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            mode: TransferMode::default(),
            chunk_size: MAX_BUFFER_SIZE,
            chunk_delay_ms: CHUNK_DELAY.as_millis() as u64,
            receive_timeout_ms: RECEIVE_TIMEOUT.as_millis() as u64,
            handshake_timeout_ms: HANDSHAKE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: String::from("127.0.0.1"),
            connect_retries: CONNECT_RETRIES,
            connect_backoff_ms: CONNECT_BACKOFF.as_millis() as u64,
            download_dir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Number of session workers: multiplier times the available hardware parallelism.
    pub fn pool_size(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.pool_multiplier.max(1) * cores
    }
}

impl TransferConfig {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Size of the receive buffer needed for one datagram in the configured mode.
    pub fn datagram_capacity(&self) -> usize {
        match self.mode {
            TransferMode::Framed => self.chunk_size + HEADER_LEN,
            TransferMode::Compat => self.chunk_size,
        }
    }
}

impl ClientConfig {
    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transfer.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".into()));
        }
        if self.transfer.datagram_capacity() > MAX_DATAGRAM_PAYLOAD {
            return Err(ConfigError::Invalid(format!(
                "chunk_size {} does not fit in a datagram",
                self.transfer.chunk_size
            )));
        }
        if self.server.pool_multiplier == 0 {
            return Err(ConfigError::Invalid(
                "pool_multiplier must be positive".into(),
            ));
        }
        if self.transfer.receive_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "receive_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
