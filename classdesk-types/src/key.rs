//! The closed enumeration of managed data keys.
//!
//! A data key names one locally-persisted, remotely-mirrored record set.
//! The set is fixed at build time; storage keys that do not parse into a
//! `DataKey` are local-only and never leave the device.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key prefix for the per-class assessment configuration.
const ASSESSMENT_CONFIG_PREFIX: &str = "assessment-config:";

/// One managed record set.
///
/// The string form doubles as the local storage key and the remote
/// `data_key` column value, so parsing and formatting must round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKey {
    /// Per-class records (rosters, grade tables).
    ClassRecords,
    /// Student profiles, keyed by student within the payload.
    StudentProfiles,
    /// The teacher's own profile.
    TeacherProfile,
    /// Attendance marks, keyed by date within the payload.
    AttendanceRecords,
    /// Assessment configuration for a single named class.
    AssessmentConfig(String),
}

impl DataKey {
    /// Returns the storage key string for this data key.
    #[must_use]
    pub fn as_storage_key(&self) -> String {
        match self {
            Self::ClassRecords => "class-records".to_string(),
            Self::StudentProfiles => "student-profiles".to_string(),
            Self::TeacherProfile => "teacher-profile".to_string(),
            Self::AttendanceRecords => "attendance-records".to_string(),
            Self::AssessmentConfig(class) => {
                format!("{ASSESSMENT_CONFIG_PREFIX}{class}")
            }
        }
    }

    /// Parses a storage key string back into a data key.
    ///
    /// Returns `None` for keys outside the managed enumeration, including
    /// an assessment-config key with an empty class suffix.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "class-records" => Some(Self::ClassRecords),
            "student-profiles" => Some(Self::StudentProfiles),
            "teacher-profile" => Some(Self::TeacherProfile),
            "attendance-records" => Some(Self::AttendanceRecords),
            _ => {
                let class = key.strip_prefix(ASSESSMENT_CONFIG_PREFIX)?;
                if class.is_empty() {
                    None
                } else {
                    Some(Self::AssessmentConfig(class.to_string()))
                }
            }
        }
    }

    /// Iterates over the non-parameterized members of the enumeration.
    ///
    /// Assessment-config keys are discovered from stored data, not listed
    /// here, since the class names are only known at runtime.
    pub fn fixed_keys() -> impl Iterator<Item = DataKey> {
        [
            Self::ClassRecords,
            Self::StudentProfiles,
            Self::TeacherProfile,
            Self::AttendanceRecords,
        ]
        .into_iter()
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_storage_key())
    }
}
