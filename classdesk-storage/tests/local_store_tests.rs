use classdesk_storage::{LocalStore, WriteHook};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct RecordingHook {
    calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingHook {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

impl WriteHook for RecordingHook {
    fn on_write(&self, key: &str, value: &Value) {
        self.calls
            .lock()
            .unwrap()
            .push((key.to_string(), value.clone()));
    }
}

// ── Read/write ───────────────────────────────────────────────────

#[test]
fn absent_key_reads_as_empty_object() {
    let store = LocalStore::open_in_memory().unwrap();
    assert_eq!(store.read("attendance-records"), json!({}));
    assert!(store.read_opt("attendance-records").is_none());
}

#[test]
fn write_then_read_roundtrip() {
    let store = LocalStore::open_in_memory().unwrap();
    let value = json!({"alice": "present", "bob": "absent"});

    store.write("attendance-records", &value).unwrap();
    assert_eq!(store.read("attendance-records"), value);
    assert_eq!(store.read_opt("attendance-records"), Some(value));
}

#[test]
fn write_overwrites_previous_value() {
    let store = LocalStore::open_in_memory().unwrap();
    store.write("teacher-profile", &json!({"name": "Ms. A"})).unwrap();
    store.write("teacher-profile", &json!({"name": "Ms. B"})).unwrap();

    assert_eq!(store.read("teacher-profile"), json!({"name": "Ms. B"}));
}

#[test]
fn non_object_values_roundtrip() {
    let store = LocalStore::open_in_memory().unwrap();
    store.write("class-records", &json!([1, 2, 3])).unwrap();
    assert_eq!(store.read("class-records"), json!([1, 2, 3]));
}

#[test]
fn remove_deletes_key() {
    let store = LocalStore::open_in_memory().unwrap();
    store.write("class-records", &json!({"7B": {}})).unwrap();
    store.remove("class-records").unwrap();

    assert!(store.read_opt("class-records").is_none());
}

#[test]
fn remove_missing_key_is_noop() {
    let store = LocalStore::open_in_memory().unwrap();
    store.remove("never-written").unwrap();
}

#[test]
fn keys_lists_stored_keys() {
    let store = LocalStore::open_in_memory().unwrap();
    store.write("class-records", &json!({})).unwrap();
    store.write("attendance-records", &json!({})).unwrap();

    let keys = store.keys().unwrap();
    assert_eq!(keys, vec!["attendance-records", "class-records"]);
}

#[test]
fn persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("classdesk.db");

    {
        let store = LocalStore::open(&path).unwrap();
        store.write("student-profiles", &json!({"alice": {}})).unwrap();
    }

    let store = LocalStore::open(&path).unwrap();
    assert_eq!(store.read("student-profiles"), json!({"alice": {}}));
}

// ── Hooks ────────────────────────────────────────────────────────

#[test]
fn write_runs_hook_exactly_once() {
    let store = LocalStore::open_in_memory().unwrap();
    let hook = RecordingHook::new();
    store.register_hook(hook.clone());

    let value = json!({"2026-02-03": "present"});
    store.write("attendance-records", &value).unwrap();

    assert_eq!(
        hook.calls(),
        vec![("attendance-records".to_string(), value)]
    );
}

#[test]
fn every_registered_hook_runs() {
    let store = LocalStore::open_in_memory().unwrap();
    let first = RecordingHook::new();
    let second = RecordingHook::new();
    store.register_hook(first.clone());
    store.register_hook(second.clone());

    store.write("class-records", &json!({})).unwrap();

    assert_eq!(first.calls().len(), 1);
    assert_eq!(second.calls().len(), 1);
}

#[test]
fn write_untracked_skips_hooks() {
    let store = LocalStore::open_in_memory().unwrap();
    let hook = RecordingHook::new();
    store.register_hook(hook.clone());

    store.write_untracked("class-records", &json!({"7B": {}})).unwrap();

    assert!(hook.calls().is_empty());
    assert_eq!(store.read("class-records"), json!({"7B": {}}));
}

#[test]
fn remove_skips_hooks() {
    let store = LocalStore::open_in_memory().unwrap();
    let hook = RecordingHook::new();
    store.register_hook(hook.clone());

    store.write("class-records", &json!({})).unwrap();
    store.remove("class-records").unwrap();

    assert_eq!(hook.calls().len(), 1);
}

#[test]
fn hook_runs_after_value_is_durable() {
    struct ReadBackHook {
        store: Arc<LocalStore>,
        seen: AtomicUsize,
    }

    impl WriteHook for ReadBackHook {
        fn on_write(&self, key: &str, value: &Value) {
            assert_eq!(&self.store.read(key), value);
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    let hook = Arc::new(ReadBackHook {
        store: store.clone(),
        seen: AtomicUsize::new(0),
    });
    store.register_hook(hook.clone());

    store.write("teacher-profile", &json!({"name": "Ms. A"})).unwrap();
    assert_eq!(hook.seen.load(Ordering::SeqCst), 1);
}
