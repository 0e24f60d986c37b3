//! Sync session state.
//!
//! Two pieces of coordination state, both owned exclusively by the
//! orchestrator task: the session phase (whether sync is enabled at all)
//! and the per-key push ledger (where each key sits in its debounce
//! lifecycle). Neither does any I/O.

use chrono::{DateTime, Utc};
use classdesk_types::{DataKey, OwnerId};
use std::collections::HashMap;

/// The session-wide sync phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No `initialize()` has run yet.
    #[default]
    Uninitialized,
    /// Startup merge in progress.
    Initializing,
    /// Authenticated and mirroring to the remote store.
    Enabled,
    /// Sync is off for this session; local-only operation.
    ///
    /// Terminal until a fresh `initialize()`, typically triggered by an
    /// auth state change.
    Disabled,
}

/// Process-wide sync session state.
#[derive(Debug, Default)]
pub struct SyncSession {
    phase: SyncPhase,
    owner: Option<OwnerId>,
    last_sync: Option<DateTime<Utc>>,
}

impl SyncSession {
    /// Creates a fresh, uninitialized session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Returns the enabled owner, if any.
    #[must_use]
    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    /// Returns the last successful sync time.
    #[must_use]
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Returns whether sync is currently enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.phase == SyncPhase::Enabled
    }

    /// Enters `Initializing`. Returns `false` if an initialization is
    /// already in flight (re-entrancy guard).
    pub fn begin_initialize(&mut self) -> bool {
        if self.phase == SyncPhase::Initializing {
            return false;
        }
        self.phase = SyncPhase::Initializing;
        true
    }

    /// Enters `Enabled` for the given owner.
    pub fn enable(&mut self, owner: OwnerId) {
        self.phase = SyncPhase::Enabled;
        self.owner = Some(owner);
    }

    /// Enters `Disabled` and forgets the owner.
    pub fn disable(&mut self) {
        self.phase = SyncPhase::Disabled;
        self.owner = None;
    }

    /// Records a successful sync at `at`.
    pub fn record_sync(&mut self, at: DateTime<Utc>) {
        self.last_sync = Some(at);
    }
}

/// Where one key sits in its push lifecycle.
///
/// Idle keys have no entry; `Scheduled` waits out the debounce window,
/// `InFlight` has an upsert on the wire. A write during `InFlight` marks
/// the entry dirty so a follow-up push runs once the current one settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// Debounce timer armed; only the matching generation may start a push.
    Scheduled {
        /// Token distinguishing the live timer from superseded ones.
        generation: u64,
    },
    /// An upsert is on the wire.
    InFlight {
        /// A newer local write arrived mid-flight.
        dirty: bool,
    },
}

/// Per-key debounce/push ledger.
///
/// Guarantees the per-key ordering rules: never two in-flight pushes for
/// one key, writes during the window reset the timer, writes mid-flight
/// queue exactly one follow-up. Keys are independent of each other.
#[derive(Debug, Default)]
pub struct PushLedger {
    entries: HashMap<DataKey, PushState>,
    generation: u64,
}

impl PushLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a local write to `key`.
    ///
    /// Returns the generation to arm a debounce timer with, or `None`
    /// when a push is already in flight (the entry is marked dirty
    /// instead).
    pub fn note_write(&mut self, key: &DataKey) -> Option<u64> {
        self.generation += 1;
        let generation = self.generation;

        match self.entries.get_mut(key) {
            None => {
                self.entries
                    .insert(key.clone(), PushState::Scheduled { generation });
                Some(generation)
            }
            Some(PushState::Scheduled { generation: slot }) => {
                *slot = generation;
                Some(generation)
            }
            Some(PushState::InFlight { dirty }) => {
                *dirty = true;
                None
            }
        }
    }

    /// Attempts to move `key` from `Scheduled` to `InFlight`.
    ///
    /// Returns `false` when the firing timer was superseded by a newer
    /// write or the key is not scheduled; the caller must not push.
    pub fn begin_push(&mut self, key: &DataKey, generation: u64) -> bool {
        match self.entries.get_mut(key) {
            Some(PushState::Scheduled { generation: slot }) if *slot == generation => {
                self.entries
                    .insert(key.clone(), PushState::InFlight { dirty: false });
                true
            }
            _ => false,
        }
    }

    /// Settles the in-flight push for `key`, successful or not.
    ///
    /// Returns the generation for a follow-up timer when the entry was
    /// dirtied mid-flight; otherwise the key returns to idle.
    pub fn settle(&mut self, key: &DataKey) -> Option<u64> {
        match self.entries.remove(key) {
            Some(PushState::InFlight { dirty: true }) => {
                self.generation += 1;
                let generation = self.generation;
                self.entries
                    .insert(key.clone(), PushState::Scheduled { generation });
                Some(generation)
            }
            Some(PushState::InFlight { dirty: false }) | None => None,
            Some(scheduled) => {
                // Settle for a key that went back to Scheduled is stale.
                self.entries.insert(key.clone(), scheduled);
                None
            }
        }
    }

    /// Returns whether `key` has a scheduled or in-flight push.
    ///
    /// Used as the echo guard: remote changes for pending keys are not
    /// applied locally.
    #[must_use]
    pub fn is_pending(&self, key: &DataKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the state for `key`, if any.
    #[must_use]
    pub fn state(&self, key: &DataKey) -> Option<PushState> {
        self.entries.get(key).copied()
    }

    /// Drops every entry (sign-out, disable).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
