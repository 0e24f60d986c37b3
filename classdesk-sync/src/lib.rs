//! Local-remote sync engine for Classdesk.
//!
//! Keeps the local store and the hosted record-set backend reconciled
//! under intermittent connectivity. The application reads and writes the
//! local store only; this crate mirrors managed-key writes outward and
//! pulls remote changes inward.
//!
//! # Architecture
//!
//! - **Mirror hook**: intercepts local writes to managed keys and feeds
//!   the debounced push path
//! - **Session**: the enable/disable state machine and per-key push ledger
//! - **Merge**: the startup reconciliation policy (remote wins when both
//!   sides hold data)
//! - **Orchestrator**: the actor owning all of the above, plus the change
//!   feed and auth gating
//!
//! # Sync Process
//!
//! 1. **Initialize**: gate on authentication, run the startup merge
//! 2. **Mirror**: local writes schedule debounced per-key pushes
//! 3. **Apply**: remote changes overwrite local copies (echo-guarded)
//! 4. **Safety net**: a periodic full sync re-pushes everything local
//!
//! # Example
//!
//! ```no_run
//! use classdesk_remote::{MemoryStore, RemoteStore};
//! use classdesk_storage::LocalStore;
//! use classdesk_sync::{SessionAuthGate, SyncConfig, start_sync};
//! use classdesk_types::OwnerId;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let local = Arc::new(LocalStore::open_in_memory()?);
//! let remote: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
//! let auth = Arc::new(SessionAuthGate::signed_in(OwnerId::new()));
//!
//! let sync = start_sync(local.clone(), remote, auth, SyncConfig::default());
//! sync.initialize().await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod backup;
mod error;
pub mod merge;
mod mirror;
mod orchestrator;
pub mod session;

pub use auth::{AuthChange, AuthGate, SessionAuthGate};
pub use backup::BackupBundle;
pub use error::{SyncError, SyncResult};
pub use merge::{MergeAction, decide, is_empty_payload};
pub use orchestrator::{
    SyncConfig, SyncEvent, SyncHandle, SyncOrchestrator, SyncStatus, start_sync,
};
pub use session::{PushLedger, PushState, SyncPhase, SyncSession};
