use crate::core_command::reply::{EntryKind, ListingRow, PERMISSION_DENIED, UNKNOWN_DIRECTORY};
use crate::core_sandbox::{directory_size, Sandbox, SandboxError};
use crate::helpers::send_reply;
use crate::session::Session;
use log::{error, warn};
use std::fs;
use std::path::Path;
use tokio::io::AsyncWrite;

/// Handles the `ls` command.
///
/// Lists the immediate children of the working directory. Directory rows
/// carry the total size of every file below them. Symlinks are listed as
/// what they point to, unless the target lies outside the root.
pub async fn handle_ls_command<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session: &mut Session,
) -> Result<(), std::io::Error> {
    let cwd = match session
        .sandbox()
        .resolve_blocking(&session.current_dir, ".")
        .await
    {
        Ok(cwd) => cwd,
        Err(e) => {
            warn!("Working directory of {} is no longer valid: {}", session.peer, e);
            let reply = if e.is_violation() {
                PERMISSION_DENIED
            } else {
                UNKNOWN_DIRECTORY
            };
            return send_reply(writer, &[reply]).await;
        }
    };

    let sandbox = session.sandbox().clone();
    let listing = tokio::task::spawn_blocking(move || list_directory(&sandbox, &cwd))
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    match listing {
        Ok(rows) => {
            let lines: Vec<String> = rows.iter().map(ToString::to_string).collect();
            send_reply(writer, &lines).await
        }
        Err(e) => {
            error!("Error reading directory: {}", e);
            send_reply(writer, &[UNKNOWN_DIRECTORY]).await
        }
    }
}

/// Builds the rows for `dir`, sorted by name.
pub fn list_directory(sandbox: &Sandbox, dir: &Path) -> Result<Vec<ListingRow>, SandboxError> {
    let entries = fs::read_dir(dir).map_err(|source| SandboxError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut rows = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(_) => continue,
        };

        let target = if file_type.is_symlink() {
            match path.canonicalize() {
                Ok(target) if sandbox.contains(&target) => target,
                _ => continue,
            }
        } else {
            path.clone()
        };

        let metadata = match fs::metadata(&target) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to get metadata for entry: {:?}, error: {}", path, e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if metadata.is_dir() {
            rows.push(ListingRow {
                kind: EntryKind::Directory,
                name,
                size: directory_size(sandbox, &target),
            });
        } else if metadata.is_file() {
            rows.push(ListingRow {
                kind: EntryKind::File,
                name,
                size: metadata.len(),
            });
        }
    }

    rows.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(rows)
}
