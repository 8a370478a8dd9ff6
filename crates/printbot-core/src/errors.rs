use std::path::PathBuf;

/// Core error type for the print bot.
///
/// Adapter crates map their specific errors into this type so the conversation
/// handler can decide between a user-facing reply and a log line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// The transient storage area could not be created or written. Fatal at startup.
    #[error("storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("invalid path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
