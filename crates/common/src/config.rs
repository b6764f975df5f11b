use chrono_tz::Tz;
use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Path to the push-gateway service account JSON file
    pub service_account_path: String,

    /// Push gateway base URL (default: the FCM production endpoint)
    pub fcm_endpoint: String,

    /// IANA timezone used to compute the "start of today" reminder boundary
    pub reference_timezone: Tz,

    /// Fallback notification title when the event record carries none
    pub default_title: String,

    /// Fallback notification body when the event record carries none
    pub default_body: String,

    /// Title for the daily reminder message
    pub reminder_title: String,

    /// Body for the daily reminder message; `{name}` is replaced with the
    /// recipient's display name
    pub reminder_body: String,

    /// Display name substituted into the reminder body when the profile has none
    pub reminder_fallback_name: String,

    /// Per-request timeout for outbound push sends, in seconds (default: 30)
    pub send_timeout_secs: u64,

    /// Maximum number of in-flight push sends per dispatch cycle (default: 16)
    pub max_concurrent_sends: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            service_account_path: std::env::var("SERVICE_ACCOUNT_PATH").map_err(|_| {
                anyhow::anyhow!("SERVICE_ACCOUNT_PATH environment variable is required")
            })?,
            fcm_endpoint: std::env::var("FCM_ENDPOINT")
                .unwrap_or_else(|_| "https://fcm.googleapis.com".to_string()),
            reference_timezone: std::env::var("REFERENCE_TIMEZONE")
                .unwrap_or_else(|_| "Europe/Rome".to_string())
                .parse()
                .map_err(|e| anyhow::anyhow!("REFERENCE_TIMEZONE is not a valid IANA zone: {e}"))?,
            default_title: std::env::var("DEFAULT_TITLE")
                .unwrap_or_else(|_| "Nuova sfida completata".to_string()),
            default_body: std::env::var("DEFAULT_BODY")
                .unwrap_or_else(|_| "Un utente ha completato una sfida giornaliera".to_string()),
            reminder_title: std::env::var("REMINDER_TITLE")
                .unwrap_or_else(|_| "Obiettivi Giornalieri".to_string()),
            reminder_body: std::env::var("REMINDER_BODY").unwrap_or_else(|_| {
                "Hey {name}, i tuoi obiettivi giornalieri ti aspettano!!".to_string()
            }),
            reminder_fallback_name: std::env::var("REMINDER_FALLBACK_NAME")
                .unwrap_or_else(|_| "utente".to_string()),
            send_timeout_secs: std::env::var("SEND_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SEND_TIMEOUT_SECS must be a valid u64"))?,
            max_concurrent_sends: std::env::var("MAX_CONCURRENT_SENDS")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_CONCURRENT_SENDS must be a valid usize"))?,
        })
    }
}
