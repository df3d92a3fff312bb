use crate::core_sandbox::error::SandboxError;
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Immutable sandbox root shared by every session of a server.
///
/// The root is canonicalized once at construction; containment is always
/// judged on canonical path components, so `/data2` is never inside `/data`.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Canonicalizes `root` and checks that it is an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let path = root.as_ref();
        let root = path.canonicalize().map_err(|e| SandboxError::InvalidRoot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !root.is_dir() {
            return Err(SandboxError::InvalidRoot {
                path: path.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Component-wise containment check of an already canonical path.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.root)
    }

    /// Resolves `candidate` against the working directory `cwd`.
    ///
    /// Absolute candidates are taken relative to the sandbox root. The joined
    /// path is canonicalized (symlinks, `.` and `..` resolved) before the
    /// containment check, and nothing is cached between calls.
    pub fn resolve(&self, cwd: &Path, candidate: &str) -> Result<PathBuf, SandboxError> {
        debug_assert!(self.contains(cwd), "working directory left the sandbox");

        let joined = if Path::new(candidate).has_root() {
            self.root.join(candidate.trim_start_matches(['/', '\\']))
        } else {
            cwd.join(candidate)
        };

        let canonical = match joined.canonicalize() {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(SandboxError::Io {
                    path: joined,
                    source: e,
                })
            }
            Err(e) => {
                debug!("Failed to canonicalize {:?}: {}", joined, e);
                return Err(SandboxError::NotFound(joined));
            }
        };

        if !self.contains(&canonical) {
            warn!(
                "Resolution of {:?} from {:?} escapes root {:?}",
                candidate, cwd, self.root
            );
            return Err(SandboxError::Violation(canonical));
        }

        Ok(canonical)
    }

    /// [`Sandbox::resolve`] on the blocking pool, for async handlers.
    pub async fn resolve_blocking(
        &self,
        cwd: &Path,
        candidate: &str,
    ) -> Result<PathBuf, SandboxError> {
        let sandbox = self.clone();
        let cwd = cwd.to_path_buf();
        let candidate = candidate.to_string();
        let fallback = cwd.clone();

        tokio::task::spawn_blocking(move || sandbox.resolve(&cwd, &candidate))
            .await
            .unwrap_or_else(|e| {
                Err(SandboxError::Io {
                    path: fallback,
                    source: std::io::Error::new(ErrorKind::Other, e),
                })
            })
    }

    /// Last path segment of a resolved directory, as shown in `cd` replies.
    pub fn display_name(&self, canonical: &Path) -> String {
        canonical
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| canonical.display().to_string())
    }
}

/// Sum of the lengths of every regular file below `dir`, at any depth.
///
/// Walks with an explicit stack. Symlinked directories are not descended
/// into; symlinks to files count with their target's length only when the
/// target lies inside `sandbox`. Unreadable directories are skipped.
pub fn directory_size(sandbox: &Sandbox, dir: &Path) -> u64 {
    let mut total = 0u64;
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping unreadable directory {:?}: {}", current, e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };

            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                total += entry.metadata().map(|m| m.len()).unwrap_or(0);
            } else if file_type.is_symlink() {
                let target = match entry.path().canonicalize() {
                    Ok(target) if sandbox.contains(&target) => target,
                    _ => continue,
                };
                if let Ok(metadata) = fs::metadata(&target) {
                    if metadata.is_file() {
                        total += metadata.len();
                    }
                }
            }
        }
    }

    total
}
