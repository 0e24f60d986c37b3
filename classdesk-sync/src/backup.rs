//! Aggregate backup bundles.
//!
//! Export reads every managed key from the remote store into one object;
//! import is the inverse. Used for backup/restore, not steady-state sync.

use chrono::{DateTime, Utc};
use classdesk_types::{DataKey, OwnerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Every managed record set for one owner, as a single object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupBundle {
    /// The owner the bundle was exported from.
    pub owner: OwnerId,
    /// When the export ran.
    pub exported_at: DateTime<Utc>,
    /// Decoded payloads by storage-key string.
    pub entries: BTreeMap<String, Value>,
}

impl BackupBundle {
    /// Creates an empty bundle for `owner`, stamped now.
    #[must_use]
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            exported_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    /// Adds one record set to the bundle.
    pub fn insert(&mut self, key: &DataKey, payload: Value) {
        self.entries.insert(key.as_storage_key(), payload);
    }

    /// Returns the number of record sets in the bundle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the bundle holds no record sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
