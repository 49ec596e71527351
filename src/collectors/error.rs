//! Error types for per-item collection.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A failure confined to one catalog item.
///
/// The orchestrator logs these and moves on to the next item.
#[derive(Error, Debug)]
pub enum CollectError {
    /// A pre-command invokes a forbidden executable
    #[error("Command Blacklist: {command}")]
    Blacklisted { command: String },

    #[error("Could not split command into arguments: {command}")]
    Tokenize { command: String },

    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command {command} exited with status {}", .code.map_or("signal".to_string(), |c| c.to_string()))]
    ExitStatus { command: String, code: Option<i32> },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CollectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CollectError::Io { path: path.into(), source }
    }
}
