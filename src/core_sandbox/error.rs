use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("No such file or directory: {0}")]
    NotFound(PathBuf),

    #[error("Path escapes the sandbox root: {0}")]
    Violation(PathBuf),

    #[error("Invalid sandbox root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SandboxError {
    pub fn is_violation(&self) -> bool {
        matches!(self, SandboxError::Violation(_))
    }
}
