//! Error types for prebake.
//!
//! Fatal conditions live here as `thiserror` variants; recoverable
//! per-line problems are collected as diagnostics in [`crate::report`]
//! instead of being raised. Whether a failure aborts the run is a
//! property of the type, not of the call site.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for prebake operations.
pub type Result<T> = std::result::Result<T, PrebakeError>;

/// Fatal error conditions. Each maps to a distinct process exit code.
#[derive(Error, Debug)]
pub enum PrebakeError {
    /// The root argument does not name a readable directory.
    #[error("not a directory: {path}")]
    InvalidRoot { path: PathBuf },

    /// The internal stage graph contains a cycle. Lists every node left
    /// with unresolved predecessors after scheduling.
    #[error("circular dependency among stages: {}", nodes.join(", "))]
    Cycle { nodes: Vec<String> },

    /// Reading an input file or writing the bake file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PrebakeError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PrebakeError::InvalidRoot { .. } => 1,
            PrebakeError::Cycle { .. } => 2,
            PrebakeError::Io { .. } => 3,
        }
    }
}
