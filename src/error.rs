//! Error types shared across the admin and archival subsystems.

use thiserror::Error;

/// Convenience alias for `Result<T, AdminError>`.
pub type AdminResult<T> = Result<T, AdminError>;

/// Failures raised by administrative commands.
///
/// Every variant except `RetryExhausted` and `Cancelled` is produced by a single
/// attempt; the retry layer treats all of them alike and wraps the last one in
/// `RetryExhausted` once the attempt ceiling is reached.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Maximum retries exceeded: {attempts}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<AdminError>,
    },

    #[error("Command cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    #[error("Admin operation failed: {0}")]
    AdminOperationFailed(String),

    #[error("Coordination path error at '{path}': {reason}")]
    CoordinationPath { path: String, reason: String },

    #[error("Malformed state record at '{path}'")]
    StateDecode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unknown admin command: {0}")]
    UnknownCommand(String),

    #[error("Invalid payload for command '{command}': {source}")]
    Payload {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdminError {
    pub fn path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CoordinationPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The innermost error for a retried command, or `self` otherwise.
    pub fn last_cause(&self) -> &AdminError {
        match self {
            AdminError::RetryExhausted { source, .. } => source.last_cause(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        AdminError::Transport(err.to_string())
    }
}

/// Failures raised while extracting documents for archival.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Failed to decode query response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Cursor document given but the filter query does not advance past it")]
    UnboundedCursor,

    #[error("Invalid archival window: {0}")]
    InvalidWindow(String),

    #[error("Failed to write archive output: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ArchiveError {
    fn from(err: reqwest::Error) -> Self {
        ArchiveError::Query(err.to_string())
    }
}
