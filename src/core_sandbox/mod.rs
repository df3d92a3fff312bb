// Path confinement for sessions: every resolved path stays under the root.

pub mod error;
pub mod resolver;

#[cfg(test)]
mod test_sandbox;

pub use error::SandboxError;
pub use resolver::{directory_size, Sandbox};
