//! SQLite storage layer for Classdesk.
//!
//! Provides the local store façade: a synchronous key/value wrapper over
//! SQLite holding JSON-serialized record sets. Local storage is the ground
//! truth when offline and always the fastest read path; the sync layer
//! mirrors writes to the remote store through the post-write hook registry.
//!
//! # Architecture
//!
//! - Values are stored as JSON text in a single `records` table
//! - Reads never fail: an absent or malformed value reads as an empty object
//! - Every `write` runs the registered hooks exactly once, synchronously,
//!   before returning; hooks defer any async work themselves

mod error;
mod local_store;

pub use error::{StorageError, StorageResult};
pub use local_store::{LocalStore, WriteHook};
