use crate::constants::MAX_COMMAND_LINE;
use crate::core_command::reply::{greeting, UNKNOWN_COMMAND};
use crate::core_command::{dispatch, Command, Flow};
use crate::helpers::{send_line, send_reply};
use crate::server::{bind_addr, ServerContext};
use crate::session::Session;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

/// Binds the control port and serves connections forever.
pub async fn start_server(context: ServerContext) -> Result<()> {
    let addr = bind_addr(&context.config, context.config.server.tcp_port)?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind control port {}", addr))?;
    info!("Server listening on {}", listener.local_addr()?);

    serve(listener, context).await
}

/// Accept loop. Each connection gets its own task holding a worker permit
/// for its whole lifetime; when every permit is taken, accepted connections
/// wait for a free worker before they are greeted.
pub async fn serve(listener: TcpListener, context: ServerContext) -> Result<()> {
    let pool_size = context.config.server.pool_size();
    let pool = Arc::new(Semaphore::new(pool_size));
    info!("Session worker pool size: {}", pool_size);

    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            }
        };
        info!("New connection from {}", addr);

        if pool.available_permits() == 0 {
            warn!("All {} workers busy, {} is queued", pool_size, addr);
        }
        let permit = Arc::clone(&pool)
            .acquire_owned()
            .await
            .context("Session worker pool closed")?;

        let context = context.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = handle_connection(socket, addr.to_string(), context).await {
                error!("Connection error for {}: {}", addr, e);
            }
            info!("Connection closed for {}", addr);
        });
    }
}

/// Session worker: greets the peer, then executes one command per line, in
/// order, until `bye`, end of stream, or an I/O error. The stream is shut
/// down on every exit path.
pub async fn handle_connection<S>(
    stream: S,
    peer: String,
    context: ServerContext,
) -> Result<(), std::io::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut session = Session::new(peer, Arc::clone(&context.sandbox));

    let result = run_session(&mut reader, &mut writer, &mut session, &context).await;

    session.close();
    if let Err(e) = writer.shutdown().await {
        debug!("Failed to shut down stream of {}: {}", session.peer, e);
    }
    result
}

async fn run_session<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &mut Session,
    context: &ServerContext,
) -> Result<(), std::io::Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send_line(writer, &greeting(&session.peer)).await?;

    let mut buffer = Vec::new();
    while session.is_active() {
        let line = match read_command_line(reader, &mut buffer).await? {
            CommandLine::Line(line) => line,
            CommandLine::TooLong => {
                warn!(
                    "[{}] Command line longer than {} bytes rejected",
                    session.peer, MAX_COMMAND_LINE
                );
                send_reply(writer, &[UNKNOWN_COMMAND]).await?;
                continue;
            }
            CommandLine::Eof => {
                info!("{} disconnected", session.peer);
                break;
            }
        };

        let line = line.trim();
        info!("[{}] Executing command: {}", session.peer, line);

        let flow = match Command::parse(line) {
            Ok(command) => dispatch(command, writer, session, context).await?,
            Err(e) => {
                debug!("Rejected command from {}: {}", session.peer, e);
                send_reply(writer, &[e.to_reply()]).await?;
                Flow::Continue
            }
        };

        if flow == Flow::Close {
            break;
        }
    }

    Ok(())
}

enum CommandLine {
    Line(String),
    TooLong,
    Eof,
}

/// Reads one line of at most [`MAX_COMMAND_LINE`] bytes. Invalid UTF-8 is
/// replaced rather than rejected. The rest of an overlong line is
/// discarded up to its newline.
async fn read_command_line<R>(reader: &mut R, buffer: &mut Vec<u8>) -> std::io::Result<CommandLine>
where
    R: AsyncBufRead + Unpin,
{
    buffer.clear();
    let n = (&mut *reader)
        .take(MAX_COMMAND_LINE as u64)
        .read_until(b'\n', buffer)
        .await?;
    if n == 0 {
        return Ok(CommandLine::Eof);
    }
    if n == MAX_COMMAND_LINE && buffer.last() != Some(&b'\n') {
        discard_line(reader).await?;
        return Ok(CommandLine::TooLong);
    }
    Ok(CommandLine::Line(String::from_utf8_lossy(buffer).into_owned()))
}

async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&byte| byte == b'\n') {
                Some(end) => (end + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if done {
            return Ok(());
        }
    }
}
