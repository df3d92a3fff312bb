use crate::core_command::reply::CONNECTION_TERMINATED;
use crate::helpers::send_reply;
use crate::session::Session;
use log::info;
use tokio::io::AsyncWrite;

/// Handles the `bye` command: acknowledges, then marks the session closed
/// so the worker releases the connection.
pub async fn handle_bye_command<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session: &mut Session,
) -> Result<(), std::io::Error> {
    info!("{} requested disconnect", session.peer);
    send_reply(writer, &[CONNECTION_TERMINATED]).await?;
    session.close();
    Ok(())
}
