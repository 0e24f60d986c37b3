//! The remote store contract.
//!
//! One trait covers every backend: the hosted Supabase service and the
//! in-process memory store used in tests. The sync orchestrator only ever
//! sees this trait.

use crate::error::RemoteResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use classdesk_types::{OwnerId, SyncEnvelope};

/// Row-level operations against the remote record-set collection.
///
/// The collection holds at most one row per `(owner_id, data_key)` pair;
/// `upsert` enforces that invariant. All operations are assumed atomic at
/// the single-row level, nothing more.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Inserts or replaces the row for the envelope's `(owner, data key)`.
    async fn upsert(&self, envelope: &SyncEnvelope) -> RemoteResult<()>;

    /// Returns every row owned by the user.
    async fn fetch_all(&self, owner: OwnerId) -> RemoteResult<Vec<SyncEnvelope>>;

    /// Returns the row for one data key, if present.
    async fn fetch_one(&self, owner: OwnerId, data_key: &str)
    -> RemoteResult<Option<SyncEnvelope>>;

    /// Deletes every row owned by the user.
    async fn delete_all(&self, owner: OwnerId) -> RemoteResult<()>;

    /// Returns rows whose `updated_at` is strictly after the cursor,
    /// oldest first. A `None` cursor returns everything.
    ///
    /// This is the pull half of the change subscription; [`ChangeFeed`]
    /// turns it into push delivery.
    ///
    /// [`ChangeFeed`]: crate::ChangeFeed
    async fn changes_since(
        &self,
        owner: OwnerId,
        cursor: Option<DateTime<Utc>>,
    ) -> RemoteResult<Vec<SyncEnvelope>>;
}
