//! Recipient store seam — profile and activity lookups.
//!
//! The pipeline talks to this trait rather than to `sqlx` directly so that
//! tests can substitute in-memory doubles for the backing store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::Recipient;

/// Read-only access to recipient profiles and their activity records.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Resolve the given identities to recipients holding a usable delivery
    /// token. Identities without a profile or without a non-empty token are
    /// silently omitted; duplicate input ids yield each recipient once.
    async fn resolve(&self, ids: &[Uuid]) -> Result<Vec<Recipient>, AppError>;

    /// Every recipient holding a usable delivery token. Candidate set for
    /// the scheduled reminder path.
    async fn list_reachable(&self) -> Result<Vec<Recipient>, AppError>;

    /// Whether any activity record exists for `user_id` with a creation
    /// timestamp at or after `since`.
    async fn has_activity_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

/// PostgreSQL-backed store over the `profiles` and `user_daily_challenges`
/// tables.
pub struct PgRecipientStore {
    pool: PgPool,
}

impl PgRecipientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientStore for PgRecipientStore {
    async fn resolve(&self, ids: &[Uuid]) -> Result<Vec<Recipient>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // ANY($1) returns each matching row once, so duplicated input ids
        // cannot double-count in the report.
        let recipients: Vec<Recipient> = sqlx::query_as(
            r#"
            SELECT id, fcm_token, name
            FROM profiles
            WHERE id = ANY($1)
              AND fcm_token IS NOT NULL
              AND fcm_token <> ''
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(recipients)
    }

    async fn list_reachable(&self) -> Result<Vec<Recipient>, AppError> {
        let recipients: Vec<Recipient> = sqlx::query_as(
            r#"
            SELECT id, fcm_token, name
            FROM profiles
            WHERE fcm_token IS NOT NULL
              AND fcm_token <> ''
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(recipients)
    }

    async fn has_activity_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_daily_challenges
                WHERE user_id = $1 AND created_at >= $2
            )
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
