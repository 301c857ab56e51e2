//! Common error types for DriveGate.

use thiserror::Error;

/// Top-level error type for DriveGate operations.
///
/// Most gateway operations collapse remote failures into empty results;
/// the variants here cover what still reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure talking to the remote API.
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials were rejected or could not be used.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// A streamed transfer was aborted part-way.
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
