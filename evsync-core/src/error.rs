//! Error types for evsync operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in evsync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Record store at {path} is unusable: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Could not write record store at {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record has no usable '{field}' field")]
    MissingKey { field: String },

    #[error("No record stored under key '{0}'")]
    UnknownKey(String),

    #[error("No unresolved records in the store")]
    EmptyStore,

    #[error("{method} {url} failed with status {status}: {reason}")]
    Upstream {
        method: String,
        url: String,
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed source record: {0}")]
    MalformedRecord(String),

    /// The operator stopped the run, e.g. by closing a prompt.
    #[error("Aborted: {0}")]
    Aborted(String),
}

impl SyncError {
    /// HTTP status of an upstream failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Transport(e.to_string())
    }
}

/// Result type alias for evsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
