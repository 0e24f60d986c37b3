//! The sync orchestrator.
//!
//! A single actor task owns all coordination state: the session phase,
//! the per-key push ledger, and the change-feed subscription. Everything
//! else (debounce timers, remote upserts, the change feed, the auth
//! listener) runs on spawned tasks that report back through the command
//! channel, so the actor never blocks on the network.
//!
//! Failure policy: remote faults are logged and absorbed; the application
//! stays fully usable offline. Only operations invoked directly through
//! the [`SyncHandle`] return errors to their caller.

use crate::auth::{AuthChange, AuthGate};
use crate::backup::BackupBundle;
use crate::error::{SyncError, SyncResult};
use crate::merge::{self, MergeAction};
use crate::mirror::MirrorHook;
use crate::session::{PushLedger, SyncSession};
use chrono::Utc;
use classdesk_remote::{ChangeFeed, ChangeSubscription, RemoteResult, RemoteStore};
use classdesk_storage::{LocalStore, WriteHook};
use classdesk_types::{DataKey, OwnerId, SyncEnvelope};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiet period before a written key is pushed (ms).
    pub debounce_ms: u64,
    /// Remote change-feed poll interval (s).
    pub poll_interval_secs: u64,
    /// Periodic full-sync safety-net interval (s).
    pub full_sync_interval_secs: u64,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1_000,
            poll_interval_secs: 30,
            full_sync_interval_secs: 300,
            event_capacity: 64,
        }
    }
}

/// Snapshot of the session's sync status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Whether sync is enabled (authenticated, remote reachable at init).
    pub enabled: bool,
    /// Last successful sync time, if any.
    pub last_sync: Option<chrono::DateTime<Utc>>,
}

/// Events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Local storage changed underneath consumers; re-read from it.
    DataLoaded,
    /// The sync status changed.
    Status(SyncStatus),
}

/// Commands processed by the orchestrator task.
pub(crate) enum SyncCommand {
    Initialize {
        reply: oneshot::Sender<SyncStatus>,
    },
    LocalWrite {
        key: DataKey,
    },
    TimerFired {
        key: DataKey,
        generation: u64,
    },
    PushSettled {
        key: DataKey,
        result: RemoteResult<()>,
    },
    RemoteChange {
        envelope: SyncEnvelope,
    },
    FullSyncTick,
    SyncAll {
        reply: oneshot::Sender<SyncResult<usize>>,
    },
    ExportAll {
        reply: oneshot::Sender<SyncResult<BackupBundle>>,
    },
    ImportAll {
        bundle: BackupBundle,
        reply: oneshot::Sender<SyncResult<usize>>,
    },
    ClearAll {
        reply: oneshot::Sender<SyncResult<()>>,
    },
    Status {
        reply: oneshot::Sender<SyncStatus>,
    },
    AuthChanged(AuthChange),
    Shutdown,
}

/// The sync orchestrator actor.
///
/// Construct with injected dependencies, then [`spawn`](Self::spawn) it to
/// get a [`SyncHandle`]. The handle's [`mirror_hook`](SyncHandle::mirror_hook)
/// must be registered on the local store for write interception; the
/// [`start_sync`] helper does all of this in one call.
pub struct SyncOrchestrator {
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthGate>,
    config: SyncConfig,
    session: SyncSession,
    ledger: PushLedger,
    events: broadcast::Sender<SyncEvent>,
    commands: mpsc::UnboundedSender<SyncCommand>,
    inbox: mpsc::UnboundedReceiver<SyncCommand>,
    feed: Option<ChangeSubscription>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator with injected dependencies.
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthGate>,
        config: SyncConfig,
    ) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            local,
            remote,
            auth,
            config,
            session: SyncSession::new(),
            ledger: PushLedger::new(),
            events,
            commands,
            inbox,
            feed: None,
        }
    }

    /// Starts the actor task and returns its handle.
    pub fn spawn(self) -> SyncHandle {
        let handle = SyncHandle {
            commands: self.commands.clone(),
            events: self.events.clone(),
        };

        Self::spawn_auth_listener(self.auth.clone(), self.commands.clone());
        Self::spawn_full_sync_ticker(
            Duration::from_secs(self.config.full_sync_interval_secs),
            self.commands.clone(),
        );

        tokio::spawn(self.run());
        handle
    }

    fn spawn_auth_listener(auth: Arc<dyn AuthGate>, commands: mpsc::UnboundedSender<SyncCommand>) {
        let mut changes = auth.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if commands.send(SyncCommand::AuthChanged(change)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("auth listener lagged, missed {} events", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn spawn_full_sync_ticker(period: Duration, commands: mpsc::UnboundedSender<SyncCommand>) {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if commands.send(SyncCommand::FullSyncTick).is_err() {
                    break;
                }
            }
        });
    }

    async fn run(mut self) {
        while let Some(command) = self.inbox.recv().await {
            match command {
                SyncCommand::Initialize { reply } => {
                    self.initialize().await;
                    let _ = reply.send(self.status());
                }
                SyncCommand::LocalWrite { key } => self.on_local_write(key),
                SyncCommand::TimerFired { key, generation } => {
                    self.on_timer_fired(key, generation);
                }
                SyncCommand::PushSettled { key, result } => self.on_push_settled(key, result),
                SyncCommand::RemoteChange { envelope } => self.on_remote_change(envelope),
                SyncCommand::FullSyncTick => {
                    if self.session.is_enabled() {
                        match self.sync_all().await {
                            Ok(pushed) => debug!("periodic full sync pushed {} keys", pushed),
                            Err(e) => warn!("periodic full sync failed: {}", e),
                        }
                    }
                }
                SyncCommand::SyncAll { reply } => {
                    let _ = reply.send(self.sync_all().await);
                }
                SyncCommand::ExportAll { reply } => {
                    let _ = reply.send(self.export_all().await);
                }
                SyncCommand::ImportAll { bundle, reply } => {
                    let _ = reply.send(self.import_all(bundle).await);
                }
                SyncCommand::ClearAll { reply } => {
                    let _ = reply.send(self.clear_all().await);
                }
                SyncCommand::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                SyncCommand::AuthChanged(change) => self.on_auth_changed(change).await,
                SyncCommand::Shutdown => break,
            }
        }
        debug!("sync orchestrator stopped");
    }

    // ── Initialization & merge ───────────────────────────────────

    async fn initialize(&mut self) {
        if !self.session.begin_initialize() {
            return;
        }
        self.feed = None;
        self.ledger.clear();

        let Some(owner) = self.auth.current_owner() else {
            info!("no authenticated user, sync disabled for this session");
            self.session.disable();
            self.emit_status();
            return;
        };

        match self.run_startup_merge(owner).await {
            Ok(()) => {
                self.session.enable(owner);
                self.session.record_sync(Utc::now());
                self.start_feed(owner);
                info!("sync enabled for owner {}", owner);
                self.emit(SyncEvent::DataLoaded);
                self.emit_status();
            }
            Err(e) => {
                warn!("startup merge failed, staying local-only: {}", e);
                self.session.disable();
                self.emit_status();
            }
        }
    }

    /// Reconciles local and remote state, one decision per key.
    ///
    /// Remote rows win over populated local keys; local-only keys are
    /// uploaded concurrently. Individual upload failures are logged and
    /// left for the periodic full sync to retry.
    async fn run_startup_merge(&mut self, owner: OwnerId) -> SyncResult<()> {
        let rows = self.remote.fetch_all(owner).await?;

        let mut remote_values: HashMap<DataKey, Value> = HashMap::new();
        for envelope in rows {
            let Some(key) = envelope.key() else {
                debug!("ignoring remote row with foreign key {}", envelope.data_key);
                continue;
            };
            match envelope.decode_payload() {
                Ok(value) => {
                    remote_values.insert(key, value);
                }
                Err(e) => warn!("remote payload for {} is malformed: {}", envelope.data_key, e),
            }
        }

        let mut keys: Vec<DataKey> = self
            .local
            .keys()?
            .iter()
            .filter_map(|k| DataKey::parse(k))
            .collect();
        for key in remote_values.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }

        let mut uploads = Vec::new();
        for key in keys {
            let storage_key = key.as_storage_key();
            let local_value = self.local.read_opt(&storage_key);
            let remote_value = remote_values.remove(&key);

            match merge::decide(local_value.as_ref(), remote_value.as_ref()) {
                MergeAction::AdoptRemote => {
                    // decide() only picks AdoptRemote when remote has data.
                    if let Some(value) = remote_value {
                        self.local.write_untracked(&storage_key, &value)?;
                        debug!("adopted remote value for {}", storage_key);
                    }
                }
                MergeAction::PushLocal => {
                    if let Some(value) = local_value {
                        uploads.push((key, value));
                    }
                }
                MergeAction::Noop => {}
            }
        }

        let remote = self.remote.clone();
        let pushes = uploads.into_iter().map(|(key, value)| {
            let remote = remote.clone();
            async move {
                match SyncEnvelope::encode(owner, &key, &value) {
                    Ok(envelope) => {
                        if let Err(e) = remote.upsert(&envelope).await {
                            warn!("merge upload for {} failed: {}", key, e);
                        }
                    }
                    Err(e) => warn!("cannot encode {} for upload: {}", key, e),
                }
            }
        });
        futures::future::join_all(pushes).await;

        Ok(())
    }

    fn start_feed(&mut self, owner: OwnerId) {
        let (subscription, mut changes) = ChangeFeed::subscribe(
            self.remote.clone(),
            owner,
            Some(Utc::now()),
            Duration::from_secs(self.config.poll_interval_secs),
        );
        self.feed = Some(subscription);

        let commands = self.commands.clone();
        tokio::spawn(async move {
            while let Some(envelope) = changes.recv().await {
                if commands.send(SyncCommand::RemoteChange { envelope }).is_err() {
                    break;
                }
            }
        });
    }

    // ── Debounced push path ──────────────────────────────────────

    fn on_local_write(&mut self, key: DataKey) {
        if !self.session.is_enabled() {
            return;
        }
        if let Some(generation) = self.ledger.note_write(&key) {
            self.arm_timer(key, generation);
        }
    }

    fn arm_timer(&self, key: DataKey, generation: u64) {
        let delay = Duration::from_millis(self.config.debounce_ms);
        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(SyncCommand::TimerFired { key, generation });
        });
    }

    fn on_timer_fired(&mut self, key: DataKey, generation: u64) {
        if !self.session.is_enabled() {
            return;
        }
        if !self.ledger.begin_push(&key, generation) {
            // Superseded by a later write; its own timer is coming.
            return;
        }
        let Some(owner) = self.session.owner() else {
            self.ledger.clear();
            return;
        };

        let storage_key = key.as_storage_key();
        let Some(value) = self.local.read_opt(&storage_key) else {
            debug!("{} vanished locally before push, skipping", storage_key);
            self.finish_push(&key);
            return;
        };

        match SyncEnvelope::encode(owner, &key, &value) {
            Ok(envelope) => {
                let remote = self.remote.clone();
                let commands = self.commands.clone();
                tokio::spawn(async move {
                    let result = remote.upsert(&envelope).await;
                    let _ = commands.send(SyncCommand::PushSettled { key, result });
                });
            }
            Err(e) => {
                warn!("cannot encode {} for push, skipping: {}", storage_key, e);
                self.finish_push(&key);
            }
        }
    }

    fn on_push_settled(&mut self, key: DataKey, result: RemoteResult<()>) {
        match result {
            Ok(()) => {
                debug!("pushed {}", key);
                self.session.record_sync(Utc::now());
                self.emit_status();
            }
            // Local data is intact; the periodic full sync retries.
            Err(e) => warn!("push for {} failed: {}", key, e),
        }
        self.finish_push(&key);
    }

    fn finish_push(&mut self, key: &DataKey) {
        if let Some(generation) = self.ledger.settle(key) {
            self.arm_timer(key.clone(), generation);
        }
    }

    // ── Real-time apply ──────────────────────────────────────────

    fn on_remote_change(&mut self, envelope: SyncEnvelope) {
        if !self.session.is_enabled() {
            return;
        }
        let Some(key) = envelope.key() else {
            return;
        };
        if self.ledger.is_pending(&key) {
            // A local push for this key is scheduled or on the wire; the
            // incoming row may be its own echo. Local state wins here.
            debug!("suppressing remote change for pending key {}", key);
            return;
        }

        let value = match envelope.decode_payload() {
            Ok(value) => value,
            Err(e) => {
                warn!("remote change for {} is malformed: {}", key, e);
                return;
            }
        };

        match self.local.write_untracked(&key.as_storage_key(), &value) {
            Ok(()) => {
                debug!("applied remote change for {}", key);
                self.emit(SyncEvent::DataLoaded);
            }
            Err(e) => warn!("cannot apply remote change for {}: {}", key, e),
        }
    }

    // ── Manual operations ────────────────────────────────────────

    /// Pushes every locally-held managed key in one pass.
    async fn sync_all(&mut self) -> SyncResult<usize> {
        let owner = self.enabled_owner()?;

        let mut uploads = Vec::new();
        for storage_key in self.local.keys()? {
            let Some(key) = DataKey::parse(&storage_key) else {
                continue;
            };
            let Some(value) = self.local.read_opt(&storage_key) else {
                continue;
            };
            if merge::is_empty_payload(&value) {
                continue;
            }
            uploads.push((key, value));
        }

        let remote = self.remote.clone();
        let pushes = uploads.into_iter().map(|(key, value)| {
            let remote = remote.clone();
            async move {
                match SyncEnvelope::encode(owner, &key, &value) {
                    Ok(envelope) => match remote.upsert(&envelope).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("full sync push for {} failed: {}", key, e);
                            false
                        }
                    },
                    Err(e) => {
                        warn!("cannot encode {} for full sync: {}", key, e);
                        false
                    }
                }
            }
        });

        let results = futures::future::join_all(pushes).await;
        let pushed = results.iter().filter(|ok| **ok).count();
        if results.iter().all(|ok| *ok) {
            self.session.record_sync(Utc::now());
            self.emit_status();
        }
        Ok(pushed)
    }

    /// Reads every remote record set into one aggregate bundle.
    async fn export_all(&mut self) -> SyncResult<BackupBundle> {
        let owner = self.enabled_owner()?;

        let mut bundle = BackupBundle::new(owner);
        for envelope in self.remote.fetch_all(owner).await? {
            let Some(key) = envelope.key() else {
                continue;
            };
            match envelope.decode_payload() {
                Ok(value) => bundle.insert(&key, value),
                Err(e) => warn!("skipping malformed export entry {}: {}", envelope.data_key, e),
            }
        }
        Ok(bundle)
    }

    /// Upserts each recognized bundle entry remotely and adopts it locally.
    async fn import_all(&mut self, bundle: BackupBundle) -> SyncResult<usize> {
        let owner = self.enabled_owner()?;

        let mut applied = 0;
        for (storage_key, value) in &bundle.entries {
            let Some(key) = DataKey::parse(storage_key) else {
                warn!("skipping unrecognized bundle key {}", storage_key);
                continue;
            };
            let envelope = SyncEnvelope::encode(owner, &key, value)?;
            self.remote.upsert(&envelope).await?;
            self.local.write_untracked(storage_key, value)?;
            applied += 1;
        }

        if applied > 0 {
            self.session.record_sync(Utc::now());
            self.emit(SyncEvent::DataLoaded);
            self.emit_status();
        }
        Ok(applied)
    }

    /// Deletes the owner's data on both sides. The only path that removes
    /// remote rows.
    async fn clear_all(&mut self) -> SyncResult<()> {
        let owner = self.enabled_owner()?;

        self.remote.delete_all(owner).await?;
        self.remove_managed_local_keys()?;
        self.ledger.clear();
        info!("cleared all record sets for owner {}", owner);
        self.emit(SyncEvent::DataLoaded);
        Ok(())
    }

    // ── Auth transitions ─────────────────────────────────────────

    async fn on_auth_changed(&mut self, change: AuthChange) {
        match change {
            AuthChange::SignedIn(owner) => {
                debug!("auth: signed in as {}, re-initializing sync", owner);
                self.initialize().await;
            }
            AuthChange::SignedOut => {
                info!("auth: signed out, disabling sync and clearing cache");
                self.feed = None;
                self.ledger.clear();
                self.session.disable();
                if let Err(e) = self.remove_managed_local_keys() {
                    warn!("failed to clear cached keys on sign-out: {}", e);
                }
                self.emit_status();
            }
        }
    }

    /// Removes every managed key from the local store, leaving
    /// unrecognized (local-only) keys untouched.
    fn remove_managed_local_keys(&self) -> SyncResult<()> {
        for storage_key in self.local.keys()? {
            if DataKey::parse(&storage_key).is_some() {
                self.local.remove(&storage_key)?;
            }
        }
        Ok(())
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn enabled_owner(&self) -> SyncResult<OwnerId> {
        if !self.session.is_enabled() {
            return Err(SyncError::Disabled);
        }
        self.session.owner().ok_or(SyncError::Disabled)
    }

    fn status(&self) -> SyncStatus {
        SyncStatus {
            enabled: self.session.is_enabled(),
            last_sync: self.session.last_sync(),
        }
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    fn emit_status(&self) {
        self.emit(SyncEvent::Status(self.status()));
    }
}

/// Cloneable handle to a spawned orchestrator.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncHandle {
    /// Runs initialization: auth gating, startup merge, feed start.
    ///
    /// Never fails on remote faults; the returned status says whether
    /// sync came up enabled.
    pub async fn initialize(&self) -> SyncResult<SyncStatus> {
        self.request(|reply| SyncCommand::Initialize { reply }).await
    }

    /// Pushes every locally-held managed key to the remote store.
    /// Returns the number of keys pushed.
    pub async fn sync_all(&self) -> SyncResult<usize> {
        self.request(|reply| SyncCommand::SyncAll { reply }).await?
    }

    /// Exports every remote record set as one aggregate bundle.
    pub async fn export_all(&self) -> SyncResult<BackupBundle> {
        self.request(|reply| SyncCommand::ExportAll { reply }).await?
    }

    /// Imports a bundle, upserting remotely and adopting locally.
    /// Returns the number of entries applied.
    pub async fn import_all(&self, bundle: BackupBundle) -> SyncResult<usize> {
        self.request(|reply| SyncCommand::ImportAll { bundle, reply })
            .await?
    }

    /// Deletes local and remote copies of every managed record set.
    pub async fn clear_all(&self) -> SyncResult<()> {
        self.request(|reply| SyncCommand::ClearAll { reply }).await?
    }

    /// Returns the current sync status.
    pub async fn status(&self) -> SyncResult<SyncStatus> {
        self.request(|reply| SyncCommand::Status { reply }).await
    }

    /// Subscribes to orchestrator events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Returns the write hook that mirrors local writes into the
    /// orchestrator. Register it on the local store.
    pub fn mirror_hook(&self) -> Arc<dyn WriteHook> {
        Arc::new(MirrorHook::new(self.commands.clone()))
    }

    /// Stops the orchestrator task.
    pub fn shutdown(&self) {
        let _ = self.commands.send(SyncCommand::Shutdown);
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SyncCommand,
    ) -> SyncResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| SyncError::ChannelClosed)?;
        response.await.map_err(|_| SyncError::ChannelClosed)
    }
}

/// Builds an orchestrator, registers its mirror hook on the local store,
/// and spawns it.
pub fn start_sync(
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthGate>,
    config: SyncConfig,
) -> SyncHandle {
    let handle = SyncOrchestrator::new(local.clone(), remote, auth, config).spawn();
    local.register_hook(handle.mirror_hook());
    handle
}
