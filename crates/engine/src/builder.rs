//! Message construction.
//!
//! Pure transformation from a notification record (or reminder context) plus
//! a recipient into the gateway message shape. The gateway's data channel
//! only carries string values, so every domain field is coerced to a string
//! before it enters the data map.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use courier_common::config::AppConfig;
use courier_common::types::{ChallengeRecord, Recipient};

/// Gateway-ready message addressed to a single device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub notification: PushNotification,
    pub data: BTreeMap<String, String>,
}

/// Visible notification content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

/// Builds per-recipient messages, applying configured fallback text where
/// the event record carries none.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    default_title: String,
    default_body: String,
    reminder_title: String,
    reminder_body: String,
    reminder_fallback_name: String,
}

impl MessageBuilder {
    pub fn new(
        default_title: String,
        default_body: String,
        reminder_title: String,
        reminder_body: String,
        reminder_fallback_name: String,
    ) -> Self {
        Self {
            default_title,
            default_body,
            reminder_title,
            reminder_body,
            reminder_fallback_name,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.default_title.clone(),
            config.default_body.clone(),
            config.reminder_title.clone(),
            config.reminder_body.clone(),
            config.reminder_fallback_name.clone(),
        )
    }

    /// Message for the change-event path: challenge notification content plus
    /// the record's domain fields in the data map.
    pub fn challenge_message(&self, record: &ChallengeRecord, recipient: &Recipient) -> PushMessage {
        let title = non_empty(record.title.as_deref()).unwrap_or(&self.default_title);
        let body = non_empty(record.message.as_deref()).unwrap_or(&self.default_body);

        let mut data = BTreeMap::new();
        data.insert("type".to_string(), "daily_challenge".to_string());
        data.insert("notification_id".to_string(), record.id.to_string());
        data.insert(
            "challenge_id".to_string(),
            record.challenge_id.map(|id| id.to_string()).unwrap_or_default(),
        );
        data.insert(
            "league_id".to_string(),
            record.league_id.map(|id| id.to_string()).unwrap_or_default(),
        );
        data.insert("created_at".to_string(), rfc3339(record.created_at));
        data.insert(
            "challenge_name".to_string(),
            record.challenge_name.clone().unwrap_or_default(),
        );
        data.insert(
            "challenge_points".to_string(),
            record.challenge_points.map(|p| p.to_string()).unwrap_or_default(),
        );
        for (key, value) in &record.extra {
            data.insert(key.clone(), coerce_to_string(value));
        }

        PushMessage {
            token: recipient.fcm_token.clone(),
            notification: PushNotification {
                title: title.to_string(),
                body: body.to_string(),
            },
            data,
        }
    }

    /// Message for the scheduled reminder path, personalized with the
    /// recipient's display name.
    pub fn reminder_message(&self, recipient: &Recipient, now: DateTime<Utc>) -> PushMessage {
        let name = non_empty(recipient.name.as_deref()).unwrap_or(&self.reminder_fallback_name);
        let body = self.reminder_body.replace("{name}", name);

        let mut data = BTreeMap::new();
        data.insert("type".to_string(), "login_reminder".to_string());
        data.insert("created_at".to_string(), rfc3339(now));

        PushMessage {
            token: recipient.fcm_token.clone(),
            notification: PushNotification {
                title: self.reminder_title.clone(),
                body,
            },
            data,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Coerce an arbitrary JSON value to the string form the gateway's data
/// channel requires. Arrays are joined into a single comma-delimited string.
pub fn coerce_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(coerce_to_string)
            .collect::<Vec<_>>()
            .join(","),
        serde_json::Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn builder() -> MessageBuilder {
        MessageBuilder::new(
            "Nuova sfida completata".to_string(),
            "Un utente ha completato una sfida giornaliera".to_string(),
            "Obiettivi Giornalieri".to_string(),
            "Hey {name}, i tuoi obiettivi giornalieri ti aspettano!!".to_string(),
            "utente".to_string(),
        )
    }

    fn recipient(name: Option<&str>) -> Recipient {
        Recipient {
            id: Uuid::new_v4(),
            fcm_token: "device-token-1".to_string(),
            name: name.map(str::to_string),
        }
    }

    fn record(value: serde_json::Value) -> ChallengeRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_challenge_message_uses_record_text() {
        let record = record(serde_json::json!({
            "id": Uuid::new_v4(),
            "title": "Sfida completata",
            "message": "Marco ha completato la sfida",
            "created_at": "2025-05-01T10:00:00Z",
        }));
        let message = builder().challenge_message(&record, &recipient(None));
        assert_eq!(message.notification.title, "Sfida completata");
        assert_eq!(message.notification.body, "Marco ha completato la sfida");
        assert_eq!(message.token, "device-token-1");
    }

    #[test]
    fn test_challenge_message_falls_back_on_missing_text() {
        let record = record(serde_json::json!({
            "id": Uuid::new_v4(),
            "title": "",
            "created_at": "2025-05-01T10:00:00Z",
        }));
        let message = builder().challenge_message(&record, &recipient(None));
        assert_eq!(message.notification.title, "Nuova sfida completata");
        assert_eq!(
            message.notification.body,
            "Un utente ha completato una sfida giornaliera"
        );
    }

    #[test]
    fn test_challenge_data_map_is_string_valued() {
        let challenge_id = Uuid::new_v4();
        let record = record(serde_json::json!({
            "id": Uuid::new_v4(),
            "created_at": "2025-05-01T10:00:00Z",
            "challenge_id": challenge_id,
            "challenge_points": 15,
            "bonus": true,
            "tags": ["alpha", 2, false],
            "missing": null,
        }));
        let message = builder().challenge_message(&record, &recipient(None));

        assert_eq!(message.data["type"], "daily_challenge");
        assert_eq!(message.data["challenge_id"], challenge_id.to_string());
        assert_eq!(message.data["challenge_points"], "15");
        assert_eq!(message.data["bonus"], "true");
        assert_eq!(message.data["tags"], "alpha,2,false");
        assert_eq!(message.data["missing"], "");
    }

    #[test]
    fn test_absent_domain_fields_degrade_to_empty_strings() {
        let record = record(serde_json::json!({
            "id": Uuid::new_v4(),
            "created_at": "2025-05-01T10:00:00Z",
        }));
        let message = builder().challenge_message(&record, &recipient(None));
        assert_eq!(message.data["challenge_id"], "");
        assert_eq!(message.data["league_id"], "");
        assert_eq!(message.data["challenge_name"], "");
        assert_eq!(message.data["challenge_points"], "");
    }

    #[test]
    fn test_reminder_message_personalized() {
        let now = Utc::now();
        let message = builder().reminder_message(&recipient(Some("Giulia")), now);
        assert_eq!(message.notification.title, "Obiettivi Giornalieri");
        assert_eq!(
            message.notification.body,
            "Hey Giulia, i tuoi obiettivi giornalieri ti aspettano!!"
        );
        assert_eq!(message.data["type"], "login_reminder");
        assert_eq!(message.data["created_at"], rfc3339(now));
    }

    #[test]
    fn test_reminder_message_name_fallback() {
        let message = builder().reminder_message(&recipient(None), Utc::now());
        assert!(message.notification.body.starts_with("Hey utente,"));
    }

    #[test]
    fn test_coerce_nested_array() {
        let value = serde_json::json!([1, ["a", "b"], null]);
        assert_eq!(coerce_to_string(&value), "1,a,b,");
    }
}
