//! Storage interception.
//!
//! A write hook that forwards every write to a managed key into the
//! orchestrator's debounced push path. Callers of the local store stay
//! unaware of the mirror; writes to keys outside the managed enumeration
//! never leave the device.

use crate::orchestrator::SyncCommand;
use classdesk_storage::WriteHook;
use classdesk_types::DataKey;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// `WriteHook` that mirrors managed-key writes to the orchestrator.
pub(crate) struct MirrorHook {
    commands: mpsc::UnboundedSender<SyncCommand>,
}

impl MirrorHook {
    pub(crate) fn new(commands: mpsc::UnboundedSender<SyncCommand>) -> Self {
        Self { commands }
    }
}

impl WriteHook for MirrorHook {
    fn on_write(&self, key: &str, _value: &Value) {
        // The pushed value is re-read from the store at push time, so the
        // hook only has to name the key.
        let Some(key) = DataKey::parse(key) else {
            return;
        };
        if self.commands.send(SyncCommand::LocalWrite { key }).is_err() {
            debug!("orchestrator gone, dropping mirror notification");
        }
    }
}
