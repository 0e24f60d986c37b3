//! Push-style change subscription over a polling cursor.
//!
//! The backend's change listing is pull-based; the feed wraps it in a
//! background task so consumers just receive envelopes on a channel. The
//! cursor only ever advances, so an envelope is delivered at most once per
//! subscription.

use crate::store::RemoteStore;
use chrono::{DateTime, Utc};
use classdesk_types::{OwnerId, SyncEnvelope};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Spawns polling subscriptions against a remote store.
pub struct ChangeFeed;

impl ChangeFeed {
    /// Starts polling for the owner's changes after `since`.
    ///
    /// Returns the subscription handle and the delivery channel. The task
    /// stops when the handle is dropped/unsubscribed or every receiver is
    /// gone. Poll failures are logged and retried on the next tick.
    pub fn subscribe(
        store: Arc<dyn RemoteStore>,
        owner: OwnerId,
        since: Option<DateTime<Utc>>,
        poll_interval: Duration,
    ) -> (ChangeSubscription, mpsc::UnboundedReceiver<SyncEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut cursor = since;
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let changed = match store.changes_since(owner, cursor).await {
                    Ok(changed) => changed,
                    Err(e) => {
                        warn!("change poll for owner {} failed: {}", owner, e);
                        continue;
                    }
                };

                for envelope in changed {
                    cursor = Some(match cursor {
                        Some(c) => c.max(envelope.updated_at),
                        None => envelope.updated_at,
                    });
                    if tx.send(envelope).is_err() {
                        debug!("change feed receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        (ChangeSubscription { task }, rx)
    }
}

/// Handle to a running change subscription.
///
/// Dropping the handle stops the polling task.
pub struct ChangeSubscription {
    task: JoinHandle<()>,
}

impl ChangeSubscription {
    /// Stops the subscription.
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
