use crate::config::Config;
use crate::constants::DEFAULT_CONFIG_PATH;
use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Env};
use log::{info, LevelFilter};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Sends one reply block: each line followed by `\n`, then the empty
/// terminator line.
pub async fn send_reply<W, S>(writer: &mut W, lines: &[S]) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    let mut block = String::new();
    for line in lines {
        block.push_str(line.as_ref());
        block.push('\n');
    }
    block.push('\n');
    writer.write_all(block.as_bytes()).await?;
    writer.flush().await
}

/// Sends a single line without a block terminator (greeting only).
pub async fn send_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    line: &str,
) -> Result<(), std::io::Error> {
    writer.write_all(format!("{}\n", line).as_bytes()).await?;
    writer.flush().await
}

/// Initializes the logger with the `[timestamp] [LEVEL] message` format.
/// `RUST_LOG` overrides the level picked from `verbose`.
pub fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_module("tokio", LevelFilter::Warn)
        .init();
}

/// Loads the configuration file given on the command line, or the system
/// default if it exists, or built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display())),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.is_file() {
                Config::load_from_file(default_path)
                    .with_context(|| format!("Failed to load configuration: {}", DEFAULT_CONFIG_PATH))
            } else {
                Ok(Config::default())
            }
        }
    }
}

pub fn log_config(config: &Config) {
    info!("  Bind Address: {}", config.server.bind_address);
    info!("  Control Port (TCP): {}", config.server.tcp_port);
    info!("  Transfer Port (UDP): {}", config.server.udp_port);
    if let Some(root) = &config.server.root_dir {
        info!("  Root Directory: {}", root.display());
    }
    info!("  Worker Pool Size: {}", config.server.pool_size());
    info!("  Transfer Mode: {:?}", config.transfer.mode);
    info!("  Chunk Size: {} bytes", config.transfer.chunk_size);
    info!("  Chunk Delay: {} ms", config.transfer.chunk_delay_ms);
}
