//! Change-event webhook route.
//!
//! The database fires this hook when a challenge notification row is
//! inserted. The body is parsed by hand rather than through the `Json`
//! extractor so that every malformed-input case maps to a plain 400 with a
//! JSON error body.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use courier_common::error::AppError;
use courier_common::types::WebhookEnvelope;

use crate::routes::DispatchResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/hooks/challenge-completed", post(challenge_completed))
}

/// POST /hooks/challenge-completed — fan the inserted notification out to
/// its target recipients.
async fn challenge_completed(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DispatchResponse>, AppError> {
    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| AppError::Payload(format!("invalid JSON in request body: {e}")))?;

    let record = envelope
        .record
        .ok_or_else(|| AppError::Payload("no notification record in request".to_string()))?;

    tracing::info!(
        table = %envelope.table,
        change = %envelope.kind,
        notification_id = %record.id,
        targets = record.target_user_ids.len(),
        "Change-event webhook received"
    );

    let report = state.pipeline.dispatch_challenge(&record).await?;
    Ok(Json(DispatchResponse::from(report)))
}
