use classdesk_types::DataKey;

// ── Fixed keys ───────────────────────────────────────────────────

#[test]
fn fixed_keys_roundtrip() {
    for key in DataKey::fixed_keys() {
        let s = key.as_storage_key();
        assert_eq!(DataKey::parse(&s), Some(key.clone()), "key {s}");
    }
}

#[test]
fn fixed_keys_count() {
    assert_eq!(DataKey::fixed_keys().count(), 4);
}

#[test]
fn parse_class_records() {
    assert_eq!(DataKey::parse("class-records"), Some(DataKey::ClassRecords));
}

#[test]
fn parse_student_profiles() {
    assert_eq!(
        DataKey::parse("student-profiles"),
        Some(DataKey::StudentProfiles)
    );
}

#[test]
fn parse_teacher_profile() {
    assert_eq!(
        DataKey::parse("teacher-profile"),
        Some(DataKey::TeacherProfile)
    );
}

#[test]
fn parse_attendance_records() {
    assert_eq!(
        DataKey::parse("attendance-records"),
        Some(DataKey::AttendanceRecords)
    );
}

// ── Parameterized key ────────────────────────────────────────────

#[test]
fn assessment_config_roundtrip() {
    let key = DataKey::AssessmentConfig("7B Math".to_string());
    let s = key.as_storage_key();
    assert_eq!(s, "assessment-config:7B Math");
    assert_eq!(DataKey::parse(&s), Some(key));
}

#[test]
fn assessment_config_empty_suffix_rejected() {
    assert_eq!(DataKey::parse("assessment-config:"), None);
}

#[test]
fn assessment_config_suffix_may_contain_colon() {
    let key = DataKey::parse("assessment-config:period:1").unwrap();
    assert_eq!(key, DataKey::AssessmentConfig("period:1".to_string()));
}

// ── Unrecognized keys ────────────────────────────────────────────

#[test]
fn unrecognized_keys_rejected() {
    assert_eq!(DataKey::parse("ui-theme"), None);
    assert_eq!(DataKey::parse(""), None);
    assert_eq!(DataKey::parse("class-records-v2"), None);
    assert_eq!(DataKey::parse("Class-Records"), None);
}

#[test]
fn display_matches_storage_key() {
    let key = DataKey::AssessmentConfig("9A".to_string());
    assert_eq!(key.to_string(), key.as_storage_key());
}
