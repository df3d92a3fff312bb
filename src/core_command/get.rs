use crate::core_command::reply::{transfer_starting, NOT_A_FILE, PERMISSION_DENIED, UNKNOWN_FILE};
use crate::core_sandbox::SandboxError;
use crate::core_transfer::{send_file, TransferChannel, TransferError, TransferRequest};
use crate::helpers::send_reply;
use crate::session::Session;
use log::{error, info, warn};
use std::path::Path;
use tokio::io::AsyncWrite;

/// Handles the `get` command.
///
/// Validation failures are answered on the control channel and never touch
/// the datagram channel. On success the channel lease is taken before the
/// `transfer starting` reply, so the receiver's handshake can only be
/// consumed by this transfer. Datagram failures end the transfer, not the
/// session.
pub async fn handle_get_command<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session: &mut Session,
    channel: &TransferChannel,
    arg: &str,
) -> Result<(), std::io::Error> {
    let request = match validate(session, arg).await {
        Ok(request) => request,
        Err(reply) => return send_reply(writer, &[reply]).await,
    };

    let lease = channel.lease().await;
    send_reply(writer, &[transfer_starting(&request.file_name)]).await?;
    info!(
        "Waiting for handshake from {} to send {:?}",
        session.peer, request.path
    );

    match send_file(&lease, &request).await {
        Ok(_) => {}
        Err(TransferError::HandshakeTimeout(wait)) => {
            warn!(
                "No handshake for {} within {:?}, transfer abandoned",
                request.file_name, wait
            );
        }
        Err(e) => error!("Transfer of {} failed: {}", request.file_name, e),
    }

    Ok(())
}

/// Resolves and checks `arg`, or returns the reply line for the failure.
pub async fn validate(session: &Session, arg: &str) -> Result<TransferRequest, &'static str> {
    let path = match session
        .sandbox()
        .resolve_blocking(&session.current_dir, arg)
        .await
    {
        Ok(path) => path,
        Err(SandboxError::NotFound(path)) => {
            warn!("Requested file does not exist: {:?}", path);
            return Err(UNKNOWN_FILE);
        }
        Err(e) => {
            warn!("get refused for {}: {}", session.peer, e);
            return Err(PERMISSION_DENIED);
        }
    };

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) => {
            error!("Failed to get file metadata: {:?}, error: {}", path, e);
            return Err(UNKNOWN_FILE);
        }
    };
    if !metadata.is_file() {
        return Err(NOT_A_FILE);
    }

    let file_name = Path::new(arg)
        .file_name()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| arg.to_string());

    Ok(TransferRequest {
        file_name,
        size: metadata.len(),
        path,
    })
}
