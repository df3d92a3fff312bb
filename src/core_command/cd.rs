use crate::core_command::reply::{directory_changed, PERMISSION_DENIED, UNKNOWN_DIRECTORY};
use crate::core_sandbox::SandboxError;
use crate::helpers::send_reply;
use crate::session::Session;
use log::{info, warn};
use std::path::Path;
use tokio::io::AsyncWrite;

/// Handles the `cd` command (and its `cd..` alias).
///
/// The working directory only changes when `arg` resolves to an existing
/// directory inside the root; every failure leaves it untouched.
pub async fn handle_cd_command<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session: &mut Session,
    arg: &str,
) -> Result<(), std::io::Error> {
    let resolved = match session
        .sandbox()
        .resolve_blocking(&session.current_dir, arg)
        .await
    {
        Ok(path) => path,
        Err(SandboxError::NotFound(path)) => {
            warn!("cd target does not exist: {:?}", path);
            return send_reply(writer, &[UNKNOWN_DIRECTORY]).await;
        }
        Err(e) => {
            warn!("cd refused for {}: {}", session.peer, e);
            return send_reply(writer, &[PERMISSION_DENIED]).await;
        }
    };

    if !is_directory(&resolved).await {
        warn!("cd target is not a directory: {:?}", resolved);
        return send_reply(writer, &[UNKNOWN_DIRECTORY]).await;
    }

    let name = session.sandbox().display_name(&resolved);
    info!("Directory successfully changed to: {:?}", resolved);
    session.current_dir = resolved;
    send_reply(writer, &[directory_changed(&name)]).await
}

async fn is_directory(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}
