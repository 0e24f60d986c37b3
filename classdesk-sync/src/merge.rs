//! Startup merge policy.
//!
//! Decides, per key, whether the local or remote value becomes
//! authoritative when a session starts. The policy is deliberately simple:
//! the remote store is the durable multi-device copy, so when both sides
//! hold data, remote wins. There is no per-field merging and no vector
//! clock; concurrent multi-device edits resolve to the last remote write.

use serde_json::Value;

/// The outcome of comparing one key's local and remote values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// Overwrite the local copy with the remote value.
    AdoptRemote,
    /// Upload the local value to the remote store.
    PushLocal,
    /// Nothing to do.
    Noop,
}

/// Returns whether a payload counts as empty for merge purposes.
///
/// Reading an absent key yields an empty object, so an empty object (or
/// null) is indistinguishable from "never written" and is treated as such.
#[must_use]
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Decides the merge action for one key.
///
/// `None` means the side has no value at all; a `Some` empty payload is
/// folded into the same case.
#[must_use]
pub fn decide(local: Option<&Value>, remote: Option<&Value>) -> MergeAction {
    let local_has_data = local.is_some_and(|v| !is_empty_payload(v));
    let remote_has_data = remote.is_some_and(|v| !is_empty_payload(v));

    match (local_has_data, remote_has_data) {
        (_, true) => MergeAction::AdoptRemote,
        (true, false) => MergeAction::PushLocal,
        (false, false) => MergeAction::Noop,
    }
}
