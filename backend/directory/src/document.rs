//! Decoding of stored profile documents.
//!
//! Stored records are loosely typed. A counter holding the wrong kind of
//! value (a float, a string, null) is read as zero and reported as a
//! warning; only a record that is not an object at all is rejected.

use serde_json::{Map, Value};
use tracing::warn;

use staytime_core::{StayError, UserProfile};

pub const FIELD_USER_ID: &str = "UserID";
pub const FIELD_USER_NAME: &str = "UserName";
pub const FIELD_TOTAL: &str = "TotalStayingTime";
pub const FIELD_WEEKLY: &str = "WeeklyStayingTime";
pub const FIELD_RANK: &str = "UserRank";

/// A decoded profile plus the fields that had to be defaulted.
#[derive(Debug, Clone)]
pub struct DecodedProfile {
    pub profile: UserProfile,
    pub warnings: Vec<String>,
}

/// Decode one stored document. `record_id` is the key the record is stored under.
pub fn decode_profile(record_id: &str, doc: &Value) -> Result<DecodedProfile, StayError> {
    let Value::Object(map) = doc else {
        return Err(StayError::MalformedRecord {
            user_id: record_id.to_string(),
            message: format!("expected an object, found {}", type_name(doc)),
        });
    };

    let mut warnings = Vec::new();

    let user_id = match map.get(FIELD_USER_ID) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(other) => {
            warnings.push(format!("{FIELD_USER_ID} is {}", type_name(other)));
            record_id.to_string()
        }
        None => record_id.to_string(),
    };

    let user_name = match map.get(FIELD_USER_NAME) {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => {
            warnings.push(format!("{FIELD_USER_NAME} is {}", type_name(other)));
            String::new()
        }
    };

    let profile = UserProfile {
        user_id,
        user_name,
        total_staying_time: read_counter(map, FIELD_TOTAL, &mut warnings),
        weekly_staying_time: read_counter(map, FIELD_WEEKLY, &mut warnings),
        user_rank: read_counter(map, FIELD_RANK, &mut warnings),
    };

    for warning in &warnings {
        warn!(record = %record_id, field = %warning, "Malformed field read as default");
    }

    Ok(DecodedProfile { profile, warnings })
}

/// Encode a profile as a stored document.
pub fn encode_profile(profile: &UserProfile) -> Value {
    let mut map = Map::new();
    map.insert(FIELD_USER_ID.into(), Value::String(profile.user_id.clone()));
    map.insert(FIELD_USER_NAME.into(), Value::String(profile.user_name.clone()));
    map.insert(FIELD_TOTAL.into(), Value::from(profile.total_staying_time));
    map.insert(FIELD_WEEKLY.into(), Value::from(profile.weekly_staying_time));
    map.insert(FIELD_RANK.into(), Value::from(profile.user_rank));
    Value::Object(map)
}

fn read_counter(map: &Map<String, Value>, field: &str, warnings: &mut Vec<String>) -> i64 {
    match map.get(field) {
        None => 0,
        Some(value) => match value.as_i64() {
            Some(n) => n,
            None => {
                warnings.push(format!("{field} is {}", type_name(value)));
                0
            }
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a float",
        Value::Number(_) => "an unsigned integer out of range",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_well_formed() {
        let doc = json!({
            "UserID": "42",
            "UserName": "alice",
            "TotalStayingTime": 3600,
            "WeeklyStayingTime": 120,
            "UserRank": 0,
        });
        let decoded = decode_profile("42", &doc).unwrap();
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.profile.total_staying_time, 3600);
        assert_eq!(decoded.profile.weekly_staying_time, 120);
        assert_eq!(decoded.profile.user_name, "alice");
    }

    #[test]
    fn test_wrong_counter_type_reads_as_zero() {
        let doc = json!({
            "UserID": "42",
            "UserName": "alice",
            "TotalStayingTime": 12.5,
            "WeeklyStayingTime": "300",
        });
        let decoded = decode_profile("42", &doc).unwrap();
        assert_eq!(decoded.profile.total_staying_time, 0);
        assert_eq!(decoded.profile.weekly_staying_time, 0);
        assert_eq!(decoded.warnings.len(), 2);
    }

    #[test]
    fn test_missing_user_id_falls_back_to_record_key() {
        let doc = json!({ "WeeklyStayingTime": 5 });
        let decoded = decode_profile("doc-7", &doc).unwrap();
        assert_eq!(decoded.profile.user_id, "doc-7");
        assert_eq!(decoded.profile.weekly_staying_time, 5);
        assert!(decoded.warnings.is_empty());
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = decode_profile("bad", &json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, StayError::MalformedRecord { .. }));
    }

    #[test]
    fn test_encode_then_decode_keeps_fields() {
        let mut profile = UserProfile::empty("9");
        profile.user_name = "bob".into();
        profile.add_session(61);
        let decoded = decode_profile("9", &encode_profile(&profile)).unwrap();
        assert_eq!(decoded.profile, profile);
    }
}
