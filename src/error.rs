use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can end a transfer step.
///
/// A remote command that merely exits non-zero is *not* an error; callers get a
/// [`CommandResult`](crate::remote::CommandResult) and branch on it. Only when a
/// step cannot continue without that command does it become [`RemoteCommand`].
///
/// [`RemoteCommand`]: TransferError::RemoteCommand
#[derive(Debug, Error)]
pub enum TransferError {
    /// The command never reached the device (binary missing, link down).
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("remote command failed: {command}: {output}")]
    RemoteCommand { command: String, output: String },

    #[error("{source_path} -> {destination}: {reason}")]
    ItemCopy {
        source_path: String,
        destination: String,
        reason: String,
    },

    #[error("malformed manifest: {0}")]
    Manifest(String),

    #[error("cannot plan transfer: {0}")]
    Plan(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TransferError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TransferError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the failure came from the link itself rather than from the data.
    pub fn is_transport(&self) -> bool {
        matches!(self, TransferError::Transport(_))
    }
}

pub type Result<T, E = TransferError> = std::result::Result<T, E>;
