use crate::config::Config;
use crate::core_client::error::ClientError;
use crate::core_command::reply::{
    parse_transfer_starting, CONNECTION_TERMINATED, NOT_A_FILE, PERMISSION_DENIED,
    TOO_FEW_ARGUMENTS, TOO_MANY_ARGUMENTS, UNKNOWN_COMMAND, UNKNOWN_DIRECTORY, UNKNOWN_FILE,
};
use crate::core_command::Command;
use crate::core_transfer::{receive_file, ReceiveReport, TransferChannel};
use colored::Colorize;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::sleep;

/// Result of one command round trip.
#[derive(Debug)]
pub struct Exchange {
    pub reply: Vec<String>,
    pub download: Option<Download>,
    /// The server acknowledged `bye` and is closing the connection.
    pub closed: bool,
}

/// A file received over the datagram channel.
#[derive(Debug)]
pub struct Download {
    pub path: PathBuf,
    /// False when the local file could not be created; the datagrams were
    /// received and discarded.
    pub saved: bool,
    pub report: ReceiveReport,
}

pub struct FileClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    channel: TransferChannel,
    download_dir: PathBuf,
}

/// Connects to `addr`, retrying with a fixed backoff. Gives up after
/// `retries` attempts (at least one).
pub async fn connect_with_retry(
    addr: &str,
    retries: u32,
    backoff: Duration,
) -> Result<TcpStream, ClientError> {
    let attempts = retries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(source) if attempt >= attempts => {
                return Err(ClientError::ConnectFailed {
                    addr: addr.to_string(),
                    attempts: attempt,
                    source,
                })
            }
            Err(e) => {
                warn!(
                    "Connection to {} failed ({}), retrying in {:?}",
                    addr, e, backoff
                );
                sleep(backoff).await;
            }
        }
    }
}

/// Reads reply lines up to the empty terminator line.
pub async fn read_reply_block<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Vec<String>, ClientError> {
    let mut lines = Vec::new();
    let mut buffer = String::new();
    loop {
        buffer.clear();
        if reader.read_line(&mut buffer).await? == 0 {
            if lines.is_empty() {
                return Err(ClientError::Disconnected);
            }
            return Ok(lines);
        }
        let line = buffer.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(lines);
        }
        lines.push(line.to_string());
    }
}

impl FileClient {
    /// Opens the control connection (with retries) and the datagram channel
    /// towards the same host.
    pub async fn connect(config: &Config) -> Result<Self, ClientError> {
        let tcp_addr = format!(
            "{}:{}",
            config.client.server_address, config.server.tcp_port
        );
        let stream = connect_with_retry(
            &tcp_addr,
            config.client.connect_retries,
            config.client.connect_backoff(),
        )
        .await?;

        let udp_addr = SocketAddr::new(stream.peer_addr()?.ip(), config.server.udp_port);
        let channel = TransferChannel::connect(udp_addr, config.transfer.clone()).await?;
        info!("Connected to {} (datagrams via {})", tcp_addr, udp_addr);

        Ok(Self::from_parts(
            stream,
            channel,
            config.client.download_dir.clone(),
        ))
    }

    pub fn from_parts(stream: TcpStream, channel: TransferChannel, download_dir: PathBuf) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
            channel,
            download_dir,
        }
    }

    /// Reads the single greeting line sent on connect.
    pub async fn greeting(&mut self) -> Result<String, ClientError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::Disconnected);
        }
        Ok(line.trim_end().to_string())
    }

    /// Sends one command line and collects its reply. A `get` that the
    /// server accepted is followed by the receiver role on the datagram
    /// channel before this returns.
    pub async fn execute(&mut self, line: &str) -> Result<Exchange, ClientError> {
        let line = line.trim();
        self.writer.write_all(format!("{}\n", line).as_bytes()).await?;
        self.writer.flush().await?;

        let reply = read_reply_block(&mut self.reader).await?;
        let command = Command::parse(line);

        let announced = match &command {
            Ok(Command::Get(_)) => reply
                .first()
                .and_then(|first| parse_transfer_starting(first))
                .map(str::to_string),
            _ => None,
        };
        let download = match announced {
            Some(name) => Some(self.receive(&name).await?),
            None => None,
        };

        let closed = command == Ok(Command::Bye)
            && reply.iter().any(|reply_line| reply_line == CONNECTION_TERMINATED);

        Ok(Exchange {
            reply,
            download,
            closed,
        })
    }

    async fn receive(&self, announced: &str) -> Result<Download, ClientError> {
        // Only the final component is used, whatever the server announced.
        let name = Path::new(announced)
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "download".into());
        let path = self.download_dir.join(name);

        let lease = self.channel.lease().await;
        let (saved, report) = match File::create(&path).await {
            Ok(mut file) => (true, receive_file(&lease, &mut file).await?),
            Err(e) => {
                warn!("Cannot create {}: {}", path.display(), e);
                (false, receive_file(&lease, &mut tokio::io::sink()).await?)
            }
        };
        debug!("Receive report for {}: {:?}", path.display(), report);

        Ok(Download {
            path,
            saved,
            report,
        })
    }

    /// Interactive loop: one command per input line until `bye` or end of
    /// input.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<(), ClientError> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let exchange = self.execute(&line).await?;
            for reply_line in &exchange.reply {
                if is_error_reply(reply_line) {
                    println!("{}", reply_line.red());
                } else {
                    println!("{}", reply_line);
                }
            }
            if let Some(download) = &exchange.download {
                print_download(download);
            }
            if exchange.closed {
                break;
            }
        }
        Ok(())
    }
}

fn is_error_reply(line: &str) -> bool {
    [
        TOO_MANY_ARGUMENTS,
        TOO_FEW_ARGUMENTS,
        UNKNOWN_COMMAND,
        UNKNOWN_DIRECTORY,
        UNKNOWN_FILE,
        PERMISSION_DENIED,
        NOT_A_FILE,
    ]
    .contains(&line)
}

fn print_download(download: &Download) {
    let report = &download.report;
    if !download.saved {
        println!(
            "{}",
            format!(
                "File '{}' could not be created locally, {} bytes discarded",
                download.path.display(),
                report.bytes_received
            )
            .red()
        );
        return;
    }

    println!(
        "{}",
        format!(
            "Transfer finished: {} ({} bytes)",
            download.path.display(),
            report.bytes_received
        )
        .green()
    );
    if !report.complete {
        let expected = report
            .expected_len
            .map(|len| format!("{} bytes expected", len))
            .unwrap_or_else(|| "no end marker received".to_string());
        println!(
            "{}",
            format!("Warning: transfer may be incomplete ({})", expected).yellow()
        );
    }
    if report.gaps > 0 || report.out_of_order > 0 {
        println!(
            "{}",
            format!(
                "Warning: {} datagram(s) missing, {} out of order",
                report.gaps, report.out_of_order
            )
            .yellow()
        );
    }
}
