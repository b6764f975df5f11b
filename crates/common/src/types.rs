use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Webhook trigger payload delivered on a database change.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Change kind as reported by the trigger (INSERT, UPDATE, DELETE).
    /// Carried for logging only, so unknown values are accepted as-is.
    #[serde(rename = "type")]
    pub kind: String,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    /// The inserted notification row. Absent record is an input error.
    #[serde(default)]
    pub record: Option<ChallengeRecord>,
}

/// A challenge notification row, as delivered by the change-event trigger.
///
/// Consumed once per dispatch invocation and never mutated afterwards.
/// Unknown columns are preserved in `extra` so they can ride along in the
/// push data map.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeRecord {
    pub id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub league_id: Option<Uuid>,
    #[serde(default)]
    pub challenge_id: Option<Uuid>,
    #[serde(default)]
    pub challenge_name: Option<String>,
    #[serde(default)]
    pub challenge_points: Option<f64>,
    /// Target identities for the fan-out. Absent, null, or non-array values
    /// degrade to an empty set; entries that are not UUID strings are dropped.
    #[serde(default, deserialize_with = "lenient_uuid_list")]
    pub target_user_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn lenient_uuid_list<'de, D>(deserializer: D) -> Result<Vec<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let ids = match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter_map(|s| Uuid::parse_str(s).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(ids)
}

/// A recipient eligible for dispatch: the resolver guarantees `fcm_token`
/// is present and non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipient {
    pub id: Uuid,
    pub fcm_token: String,
    pub name: Option<String>,
}

/// Short-lived bearer credential for the push gateway.
///
/// Owned by a single dispatch invocation; never persisted or reused.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Result of one attempted send.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub recipient_id: Uuid,
    pub success: bool,
    pub error: Option<String>,
}

/// Summary of a completed dispatch cycle; the sole externally observable
/// result of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_record(value: serde_json::Value) -> ChallengeRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_target_user_ids_parsed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let record = parse_record(serde_json::json!({
            "id": Uuid::new_v4(),
            "created_at": "2025-05-01T10:00:00Z",
            "target_user_ids": [a.to_string(), b.to_string()],
        }));
        assert_eq!(record.target_user_ids, vec![a, b]);
    }

    #[test]
    fn test_target_user_ids_absent_degrades_to_empty() {
        let record = parse_record(serde_json::json!({
            "id": Uuid::new_v4(),
            "created_at": "2025-05-01T10:00:00Z",
        }));
        assert!(record.target_user_ids.is_empty());
    }

    #[test]
    fn test_target_user_ids_non_array_degrades_to_empty() {
        let record = parse_record(serde_json::json!({
            "id": Uuid::new_v4(),
            "created_at": "2025-05-01T10:00:00Z",
            "target_user_ids": "not-an-array",
        }));
        assert!(record.target_user_ids.is_empty());
    }

    #[test]
    fn test_target_user_ids_drops_non_uuid_entries() {
        let a = Uuid::new_v4();
        let record = parse_record(serde_json::json!({
            "id": Uuid::new_v4(),
            "created_at": "2025-05-01T10:00:00Z",
            "target_user_ids": [a.to_string(), "garbage", 42, null],
        }));
        assert_eq!(record.target_user_ids, vec![a]);
    }

    #[test]
    fn test_unknown_record_fields_preserved_in_extra() {
        let record = parse_record(serde_json::json!({
            "id": Uuid::new_v4(),
            "created_at": "2025-05-01T10:00:00Z",
            "bonus_round": true,
        }));
        assert_eq!(
            record.extra.get("bonus_round"),
            Some(&serde_json::Value::Bool(true))
        );
    }

    #[test]
    fn test_envelope_without_record() {
        let envelope: WebhookEnvelope = serde_json::from_value(serde_json::json!({
            "type": "INSERT",
            "table": "notifications",
            "schema": "public",
        }))
        .unwrap();
        assert_eq!(envelope.kind, "INSERT");
        assert!(envelope.record.is_none());
    }
}
