//! In-process remote store.
//!
//! Implements the full `RemoteStore` contract over a map, preserving each
//! envelope's `updated_at` stamp so change-cursor behavior matches the
//! hosted backend. Used by tests and offline development builds.

use crate::error::RemoteResult;
use crate::store::RemoteStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use classdesk_types::{OwnerId, SyncEnvelope};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A `RemoteStore` backed by an in-memory map.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<(OwnerId, String), SyncEnvelope>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows held for an owner.
    pub async fn row_count(&self, owner: OwnerId) -> usize {
        self.rows
            .read()
            .await
            .keys()
            .filter(|(o, _)| *o == owner)
            .count()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn upsert(&self, envelope: &SyncEnvelope) -> RemoteResult<()> {
        let key = (envelope.owner_id, envelope.data_key.clone());
        self.rows.write().await.insert(key, envelope.clone());
        Ok(())
    }

    async fn fetch_all(&self, owner: OwnerId) -> RemoteResult<Vec<SyncEnvelope>> {
        let rows = self.rows.read().await;
        let mut found: Vec<SyncEnvelope> = rows
            .iter()
            .filter(|((o, _), _)| *o == owner)
            .map(|(_, env)| env.clone())
            .collect();
        found.sort_by(|a, b| a.data_key.cmp(&b.data_key));
        Ok(found)
    }

    async fn fetch_one(
        &self,
        owner: OwnerId,
        data_key: &str,
    ) -> RemoteResult<Option<SyncEnvelope>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&(owner, data_key.to_string())).cloned())
    }

    async fn delete_all(&self, owner: OwnerId) -> RemoteResult<()> {
        self.rows.write().await.retain(|(o, _), _| *o != owner);
        Ok(())
    }

    async fn changes_since(
        &self,
        owner: OwnerId,
        cursor: Option<DateTime<Utc>>,
    ) -> RemoteResult<Vec<SyncEnvelope>> {
        let rows = self.rows.read().await;
        let mut changed: Vec<SyncEnvelope> = rows
            .iter()
            .filter(|((o, _), env)| {
                *o == owner && cursor.is_none_or(|c| env.updated_at > c)
            })
            .map(|(_, env)| env.clone())
            .collect();
        changed.sort_by_key(|env| env.updated_at);
        Ok(changed)
    }
}
