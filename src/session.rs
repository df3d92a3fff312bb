use crate::core_sandbox::Sandbox;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closed,
}

/// Per-connection state. `current_dir` is always canonical and inside the
/// sandbox root; only the `cd` handler moves it, after a fresh resolution.
#[derive(Debug)]
pub struct Session {
    pub peer: String,
    pub current_dir: PathBuf,
    pub state: SessionState,
    sandbox: Arc<Sandbox>,
}

impl Session {
    pub fn new(peer: String, sandbox: Arc<Sandbox>) -> Self {
        Self {
            peer,
            current_dir: sandbox.root().to_path_buf(),
            state: SessionState::Active,
            sandbox,
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}
