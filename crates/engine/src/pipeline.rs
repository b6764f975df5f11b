//! Dispatch orchestration.
//!
//! Wires the injected seams together for both invocation paths:
//! resolve targets → obtain credential → build per-recipient messages →
//! concurrent send → aggregate outcomes. Shared prerequisites (recipient
//! resolution, credential exchange) fail the whole invocation; everything
//! after the fan-out is per-recipient.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use courier_common::error::AppError;
use courier_common::types::{ChallengeRecord, DeliveryReport};

use crate::builder::MessageBuilder;
use crate::credentials::AccessTokenProvider;
use crate::dispatcher::Dispatcher;
use crate::reminder;
use crate::report;
use crate::store::RecipientStore;

/// One fully wired dispatch pipeline. All collaborators are injected so
/// tests can run it against in-memory stores and a mock gateway.
pub struct DispatchPipeline {
    store: Arc<dyn RecipientStore>,
    tokens: Arc<dyn AccessTokenProvider>,
    builder: MessageBuilder,
    dispatcher: Dispatcher,
    reference_timezone: Tz,
}

impl DispatchPipeline {
    pub fn new(
        store: Arc<dyn RecipientStore>,
        tokens: Arc<dyn AccessTokenProvider>,
        builder: MessageBuilder,
        dispatcher: Dispatcher,
        reference_timezone: Tz,
    ) -> Self {
        Self {
            store,
            tokens,
            builder,
            dispatcher,
            reference_timezone,
        }
    }

    /// Change-event path: fan out one challenge notification to the record's
    /// target identities.
    pub async fn dispatch_challenge(
        &self,
        record: &ChallengeRecord,
    ) -> Result<DeliveryReport, AppError> {
        let recipients = self.store.resolve(&record.target_user_ids).await?;

        tracing::info!(
            notification_id = %record.id,
            targets = record.target_user_ids.len(),
            reachable = recipients.len(),
            "Resolved challenge notification targets"
        );

        if recipients.is_empty() {
            return Ok(report::aggregate(&[]));
        }

        // Credential is fetched only once targets are known to exist, and
        // before any message is built.
        let token = self.tokens.fetch_token().await?;

        let batch: Vec<_> = recipients
            .iter()
            .map(|r| (r.clone(), self.builder.challenge_message(record, r)))
            .collect();

        let outcomes = self.dispatcher.send_all(&token, batch).await;
        let summary = report::aggregate(&outcomes);

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Challenge dispatch complete"
        );

        Ok(summary)
    }

    /// Scheduled path: remind every reachable recipient with no activity
    /// today in the reference timezone.
    pub async fn dispatch_reminders(&self) -> Result<DeliveryReport, AppError> {
        self.dispatch_reminders_at(Utc::now()).await
    }

    /// `now` is injectable so tests can pin the day boundary.
    pub async fn dispatch_reminders_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<DeliveryReport, AppError> {
        let eligible =
            reminder::eligible_candidates(self.store.as_ref(), self.reference_timezone, now)
                .await?;

        tracing::info!(eligible = eligible.len(), "Selected reminder candidates");

        if eligible.is_empty() {
            return Ok(report::aggregate(&[]));
        }

        let token = self.tokens.fetch_token().await?;

        let batch: Vec<_> = eligible
            .iter()
            .map(|r| (r.clone(), self.builder.reminder_message(r, now)))
            .collect();

        let outcomes = self.dispatcher.send_all(&token, batch).await;
        let summary = report::aggregate(&outcomes);

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Reminder dispatch complete"
        );

        Ok(summary)
    }
}
