use chrono::{Duration, Utc};
use classdesk_remote::{MemoryStore, RemoteStore};
use classdesk_types::{DataKey, OwnerId, SyncEnvelope};
use pretty_assertions::assert_eq;
use serde_json::json;

fn envelope(owner: OwnerId, key: &DataKey, payload: serde_json::Value) -> SyncEnvelope {
    SyncEnvelope::encode(owner, key, &payload).unwrap()
}

#[tokio::test]
async fn upsert_then_fetch_one() {
    let store = MemoryStore::new();
    let owner = OwnerId::new();

    store
        .upsert(&envelope(owner, &DataKey::StudentProfiles, json!({"name": "Alice"})))
        .await
        .unwrap();

    let row = store
        .fetch_one(owner, "student-profiles")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.decode_payload().unwrap(), json!({"name": "Alice"}));
}

#[tokio::test]
async fn upsert_replaces_existing_row() {
    let store = MemoryStore::new();
    let owner = OwnerId::new();

    store
        .upsert(&envelope(owner, &DataKey::TeacherProfile, json!({"name": "Ms. A"})))
        .await
        .unwrap();
    store
        .upsert(&envelope(owner, &DataKey::TeacherProfile, json!({"name": "Ms. B"})))
        .await
        .unwrap();

    assert_eq!(store.row_count(owner).await, 1);
    let row = store
        .fetch_one(owner, "teacher-profile")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.decode_payload().unwrap(), json!({"name": "Ms. B"}));
}

#[tokio::test]
async fn fetch_all_scopes_by_owner() {
    let store = MemoryStore::new();
    let u1 = OwnerId::new();
    let u2 = OwnerId::new();

    store
        .upsert(&envelope(u1, &DataKey::ClassRecords, json!({"7B": {}})))
        .await
        .unwrap();
    store
        .upsert(&envelope(u2, &DataKey::ClassRecords, json!({"9A": {}})))
        .await
        .unwrap();

    let rows = store.fetch_all(u1).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].owner_id, u1);
}

#[tokio::test]
async fn delete_all_only_touches_owner() {
    let store = MemoryStore::new();
    let u1 = OwnerId::new();
    let u2 = OwnerId::new();

    store
        .upsert(&envelope(u1, &DataKey::ClassRecords, json!({})))
        .await
        .unwrap();
    store
        .upsert(&envelope(u2, &DataKey::ClassRecords, json!({})))
        .await
        .unwrap();

    store.delete_all(u1).await.unwrap();
    assert_eq!(store.row_count(u1).await, 0);
    assert_eq!(store.row_count(u2).await, 1);
}

#[tokio::test]
async fn changes_since_respects_cursor() {
    let store = MemoryStore::new();
    let owner = OwnerId::new();
    let base = Utc::now();

    let mut old = envelope(owner, &DataKey::ClassRecords, json!({}));
    old.updated_at = base;
    let mut new = envelope(owner, &DataKey::AttendanceRecords, json!({}));
    new.updated_at = base + Duration::seconds(5);

    store.upsert(&old).await.unwrap();
    store.upsert(&new).await.unwrap();

    let all = store.changes_since(owner, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].data_key, "class-records");

    let after = store.changes_since(owner, Some(base)).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].data_key, "attendance-records");

    let none = store
        .changes_since(owner, Some(base + Duration::seconds(5)))
        .await
        .unwrap();
    assert!(none.is_empty());
}
