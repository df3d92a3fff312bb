// src/constants.rs

use std::time::Duration;

pub const DEFAULT_TCP_PORT: u16 = 2021;
pub const DEFAULT_UDP_PORT: u16 = 2020;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Workers per available core.
pub const POOL_SIZE_MULTIPLIER: usize = 4;

pub const MAX_BUFFER_SIZE: usize = 1024;
/// Longest command line accepted on the control channel, newline included.
pub const MAX_COMMAND_LINE: usize = 4096;
/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

pub const CHUNK_DELAY: Duration = Duration::from_millis(10);
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(1000);
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

pub const CONNECT_RETRIES: u32 = 10;
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(3);

pub const DEFAULT_CONFIG_PATH: &str = "/etc/rouilleudpd.conf";
