use crate::core_command::bye::handle_bye_command;
use crate::core_command::cd::handle_cd_command;
use crate::core_command::command::Command;
use crate::core_command::get::handle_get_command;
use crate::core_command::ls::handle_ls_command;
use crate::helpers::send_reply;
use crate::server::ServerContext;
use crate::session::Session;
use tokio::io::AsyncWrite;

/// What the session loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Runs one parsed command against the session. Errors are transport
/// failures on the control stream; protocol and filesystem problems are
/// answered inline.
pub async fn dispatch<W: AsyncWrite + Unpin>(
    command: Command,
    writer: &mut W,
    session: &mut Session,
    context: &ServerContext,
) -> Result<Flow, std::io::Error> {
    match command {
        Command::Ls => handle_ls_command(writer, session).await?,
        Command::Cd(path) => handle_cd_command(writer, session, &path).await?,
        Command::Get(name) => handle_get_command(writer, session, &context.channel, &name).await?,
        Command::Bye => handle_bye_command(writer, session).await?,
        Command::Empty => send_reply::<_, &str>(writer, &[]).await?,
    }

    Ok(if session.is_active() {
        Flow::Continue
    } else {
        Flow::Close
    })
}
