//! The local store façade.
//!
//! A synchronous key/value store over SQLite. All record sets are JSON
//! values; the store does not interpret them. Write hooks let the sync
//! layer observe mutations without callers changing their call sites.

use crate::error::StorageResult;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

/// Observer invoked after every tracked write.
///
/// Hooks run synchronously on the writer's thread and must not block;
/// implementations that need async work hand it off (e.g. by sending on an
/// unbounded channel) and return immediately.
pub trait WriteHook: Send + Sync {
    /// Called once per `write`, after the value is durable locally.
    fn on_write(&self, key: &str, value: &Value);
}

/// Synchronous key/value store holding JSON-serialized record sets.
pub struct LocalStore {
    conn: Mutex<Connection>,
    hooks: RwLock<Vec<Arc<dyn WriteHook>>>,
}

impl LocalStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store, for tests.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            hooks: RwLock::new(Vec::new()),
        })
    }

    /// Registers a post-write hook.
    pub fn register_hook(&self, hook: Arc<dyn WriteHook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// Reads the value stored under `key`.
    ///
    /// An absent key reads as an empty object, as does a stored value that
    /// no longer parses as JSON (logged, then treated as absent).
    #[must_use]
    pub fn read(&self, key: &str) -> Value {
        self.read_opt(key)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Reads the value stored under `key`, or `None` when the key is
    /// absent or its stored text is malformed.
    #[must_use]
    pub fn read_opt(&self, key: &str) -> Option<Value> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let text = conn
            .query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .unwrap_or_else(|e| {
                warn!("read of key {} failed: {}", key, e);
                None
            })?;
        drop(conn);

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("stored value for key {} is malformed, treating as absent: {}", key, e);
                None
            }
        }
    }

    /// Writes `value` under `key`, then runs every registered hook once.
    ///
    /// Hook panics or slowness are the hook's problem; the local write is
    /// already durable before any hook runs.
    pub fn write(&self, key: &str, value: &Value) -> StorageResult<()> {
        self.put(key, value)?;

        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
        for hook in hooks.iter() {
            hook.on_write(key, value);
        }
        Ok(())
    }

    /// Writes `value` under `key` without running hooks.
    ///
    /// Used by the sync layer when adopting remote state, so that applying
    /// a remote change does not mirror it straight back out.
    pub fn write_untracked(&self, key: &str, value: &Value) -> StorageResult<()> {
        self.put(key, value)
    }

    /// Removes the value stored under `key`.
    ///
    /// Does not run write hooks and does not touch the remote store; an
    /// accidental local clear must not destroy remote backups.
    pub fn remove(&self, key: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM records WHERE key = ?1", params![key])?;
        debug!("removed key {}", key);
        Ok(())
    }

    /// Returns every stored key.
    pub fn keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT key FROM records ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn put(&self, key: &str, value: &Value) -> StorageResult<()> {
        let text = serde_json::to_string(value)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO records (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, text],
        )?;
        Ok(())
    }
}
