//! Core type definitions for Classdesk.
//!
//! This crate defines the fundamental, UI-agnostic types shared by the
//! storage, remote and sync crates:
//! - The closed enumeration of managed data keys
//! - Owner identifiers (the authenticated user that scopes remote rows)
//! - The sync envelope (wire representation of one managed record set)
//!
//! Domain-specific record shapes (class rosters, attendance grids, grade
//! tables) are plain JSON to this crate; the UI layer owns their schemas.

mod envelope;
mod ids;
mod key;

pub use envelope::SyncEnvelope;
pub use ids::OwnerId;
pub use key::DataKey;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unrecognized data key: {0}")]
    InvalidKey(String),
}
