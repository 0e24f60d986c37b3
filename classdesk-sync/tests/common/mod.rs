#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use classdesk_remote::{MemoryStore, RemoteError, RemoteResult, RemoteStore};
use classdesk_storage::LocalStore;
use classdesk_sync::{AuthGate, SessionAuthGate, SyncConfig, SyncHandle, start_sync};
use classdesk_types::{OwnerId, SyncEnvelope};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Remote store wrapper with failure injection and an upsert counter.
pub struct FlakyStore {
    inner: MemoryStore,
    fail_upserts: AtomicBool,
    fail_fetches: AtomicBool,
    upsert_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_upserts: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub async fn row_count(&self, owner: OwnerId) -> usize {
        self.inner.row_count(owner).await
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn upsert(&self, envelope: &SyncEnvelope) -> RemoteResult<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("injected upsert failure".into()));
        }
        self.inner.upsert(envelope).await
    }

    async fn fetch_all(&self, owner: OwnerId) -> RemoteResult<Vec<SyncEnvelope>> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("injected fetch failure".into()));
        }
        self.inner.fetch_all(owner).await
    }

    async fn fetch_one(
        &self,
        owner: OwnerId,
        data_key: &str,
    ) -> RemoteResult<Option<SyncEnvelope>> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("injected fetch failure".into()));
        }
        self.inner.fetch_one(owner, data_key).await
    }

    async fn delete_all(&self, owner: OwnerId) -> RemoteResult<()> {
        self.inner.delete_all(owner).await
    }

    async fn changes_since(
        &self,
        owner: OwnerId,
        cursor: Option<DateTime<Utc>>,
    ) -> RemoteResult<Vec<SyncEnvelope>> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("injected fetch failure".into()));
        }
        self.inner.changes_since(owner, cursor).await
    }
}

/// One assembled sync stack over in-memory stores.
pub struct Rig {
    pub local: Arc<LocalStore>,
    pub remote: Arc<FlakyStore>,
    pub auth: Arc<SessionAuthGate>,
    pub owner: OwnerId,
    pub sync: SyncHandle,
}

/// Config with the feed and safety-net intervals pushed far out, so tests
/// that count pushes see only the paths they drive.
pub fn quiet_config() -> SyncConfig {
    SyncConfig {
        debounce_ms: 1_000,
        poll_interval_secs: 3_600,
        full_sync_interval_secs: 86_400,
        event_capacity: 64,
    }
}

pub fn rig_with(auth: SessionAuthGate, config: SyncConfig) -> Rig {
    let local = Arc::new(LocalStore::open_in_memory().unwrap());
    let remote = Arc::new(FlakyStore::new());
    let auth = Arc::new(auth);
    let owner = auth.current_owner().unwrap_or_default();

    let sync = start_sync(local.clone(), remote.clone(), auth.clone(), config);
    Rig {
        local,
        remote,
        auth,
        owner,
        sync,
    }
}

pub fn signed_in_rig() -> Rig {
    rig_with(SessionAuthGate::signed_in(OwnerId::new()), quiet_config())
}

pub fn signed_out_rig() -> Rig {
    rig_with(SessionAuthGate::new(), quiet_config())
}

/// Polls a condition until it passes, advancing (virtual) time in small
/// steps. Panics after 15 seconds of virtual time.
macro_rules! eventually {
    ($what:expr, $cond:expr) => {{
        let mut passed = false;
        for _ in 0..600 {
            if $cond {
                passed = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
        assert!(passed, "timed out waiting for {}", $what);
    }};
}
pub(crate) use eventually;
