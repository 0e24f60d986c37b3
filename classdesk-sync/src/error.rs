//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// These stay inside the sync layer: the orchestrator logs and absorbs
/// them, and only operations invoked directly through the handle (manual
/// sync, export, import, clear) return them to the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Remote store failure.
    #[error("remote error: {0}")]
    Remote(#[from] classdesk_remote::RemoteError),

    /// Local store failure.
    #[error("storage error: {0}")]
    Storage(#[from] classdesk_storage::StorageError),

    /// Payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Envelope encoding failure.
    #[error("envelope error: {0}")]
    Envelope(#[from] classdesk_types::Error),

    /// The operation requires sync to be enabled.
    #[error("sync is disabled")]
    Disabled,

    /// The orchestrator task is gone.
    #[error("channel closed")]
    ChannelClosed,
}
