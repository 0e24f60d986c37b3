//! Error types for the remote store.

use thiserror::Error;

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur talking to the remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The backend rejected the request as unauthenticated.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Transport-level failure (connection, timeout, DNS).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Payload could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
