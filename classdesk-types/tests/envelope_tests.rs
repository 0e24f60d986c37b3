use classdesk_types::{DataKey, OwnerId, SyncEnvelope};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn encode_decode_roundtrip() {
    let owner = OwnerId::new();
    let payload = json!({"alice": {"grade": "A"}, "bob": {"grade": "B"}});

    let envelope = SyncEnvelope::encode(owner, &DataKey::StudentProfiles, &payload).unwrap();
    assert_eq!(envelope.owner_id, owner);
    assert_eq!(envelope.data_key, "student-profiles");
    assert_eq!(envelope.decode_payload().unwrap(), payload);
}

#[test]
fn key_parses_back() {
    let owner = OwnerId::new();
    let envelope =
        SyncEnvelope::encode(owner, &DataKey::AssessmentConfig("9A".into()), &json!({})).unwrap();
    assert_eq!(
        envelope.key(),
        Some(DataKey::AssessmentConfig("9A".to_string()))
    );
}

#[test]
fn key_none_for_foreign_data_key() {
    let envelope = SyncEnvelope {
        owner_id: OwnerId::new(),
        data_key: "something-else".to_string(),
        payload: "{}".to_string(),
        updated_at: chrono::Utc::now(),
    };
    assert_eq!(envelope.key(), None);
}

#[test]
fn decode_payload_rejects_malformed_json() {
    let envelope = SyncEnvelope {
        owner_id: OwnerId::new(),
        data_key: "class-records".to_string(),
        payload: "{not json".to_string(),
        updated_at: chrono::Utc::now(),
    };
    assert!(envelope.decode_payload().is_err());
}

#[test]
fn serde_roundtrip() {
    let owner = OwnerId::new();
    let envelope =
        SyncEnvelope::encode(owner, &DataKey::AttendanceRecords, &json!({"2026-02-03": "present"}))
            .unwrap();

    let text = serde_json::to_string(&envelope).unwrap();
    let parsed: SyncEnvelope = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, envelope);
}
