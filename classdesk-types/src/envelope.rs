//! The sync envelope: wire representation of one managed record set.
//!
//! Exactly one remote row exists per `(owner_id, data_key)` pair; writes
//! use upsert semantics, so the envelope carries everything needed to
//! replace the row.

use crate::{DataKey, OwnerId, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One managed record set as stored remotely.
///
/// The payload is kept serialized so the envelope round-trips through the
/// backend without the sync layer caring about record shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    /// The owning user.
    pub owner_id: OwnerId,
    /// Storage-key string form of the data key.
    pub data_key: String,
    /// JSON-serialized payload.
    pub payload: String,
    /// Server-side last-modified stamp.
    pub updated_at: DateTime<Utc>,
}

impl SyncEnvelope {
    /// Builds an envelope from a decoded payload, stamping `updated_at`
    /// with the current time.
    pub fn encode(owner_id: OwnerId, key: &DataKey, payload: &Value) -> Result<Self> {
        Ok(Self {
            owner_id,
            data_key: key.as_storage_key(),
            payload: serde_json::to_string(payload)?,
            updated_at: Utc::now(),
        })
    }

    /// Decodes the serialized payload back into JSON.
    pub fn decode_payload(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.payload)?)
    }

    /// Parses the envelope's data key, if it belongs to the managed
    /// enumeration.
    #[must_use]
    pub fn key(&self) -> Option<DataKey> {
        DataKey::parse(&self.data_key)
    }
}
