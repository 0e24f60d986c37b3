//! Auth gate interface.
//!
//! Authentication itself (sign-in flows, session issuance, token refresh)
//! lives outside this workspace; the sync layer only needs to know who the
//! current owner is and when that changes.

use classdesk_types::OwnerId;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// An authentication state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    /// A user signed in.
    SignedIn(OwnerId),
    /// The current user signed out.
    SignedOut,
}

/// Supplies authentication state and the current owner.
///
/// Every remote operation is gated on this; the orchestrator also
/// subscribes so that sign-in re-initializes sync and sign-out disables it
/// and clears the departing user's cached data.
pub trait AuthGate: Send + Sync {
    /// Returns whether a user is currently signed in.
    fn is_authenticated(&self) -> bool;

    /// Returns the current owner, if signed in.
    fn current_owner(&self) -> Option<OwnerId>;

    /// Subscribes to auth state transitions.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// In-process auth gate implementation.
///
/// The embedding application drives it from its session layer; tests drive
/// it directly.
pub struct SessionAuthGate {
    owner: RwLock<Option<OwnerId>>,
    events: broadcast::Sender<AuthChange>,
}

impl SessionAuthGate {
    /// Creates a signed-out gate.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            owner: RwLock::new(None),
            events,
        }
    }

    /// Creates a gate already signed in as `owner`.
    #[must_use]
    pub fn signed_in(owner: OwnerId) -> Self {
        let gate = Self::new();
        *gate.owner.write().unwrap_or_else(PoisonError::into_inner) = Some(owner);
        gate
    }

    /// Signs a user in and notifies subscribers.
    pub fn sign_in(&self, owner: OwnerId) {
        *self.owner.write().unwrap_or_else(PoisonError::into_inner) = Some(owner);
        let _ = self.events.send(AuthChange::SignedIn(owner));
    }

    /// Signs the current user out and notifies subscribers.
    pub fn sign_out(&self) {
        *self.owner.write().unwrap_or_else(PoisonError::into_inner) = None;
        let _ = self.events.send(AuthChange::SignedOut);
    }
}

impl Default for SessionAuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthGate for SessionAuthGate {
    fn is_authenticated(&self) -> bool {
        self.current_owner().is_some()
    }

    fn current_owner(&self) -> Option<OwnerId> {
        *self.owner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}
