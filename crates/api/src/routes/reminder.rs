//! Scheduled reminder route.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use courier_common::error::AppError;

use crate::routes::DispatchResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/jobs/daily-reminder", post(daily_reminder))
}

/// POST /jobs/daily-reminder — remind every reachable recipient with no
/// challenge activity today. Invoked on a cadence by the scheduler; no body.
async fn daily_reminder(
    State(state): State<AppState>,
) -> Result<Json<DispatchResponse>, AppError> {
    tracing::info!("Daily reminder trigger received");

    let report = state.pipeline.dispatch_reminders().await?;
    Ok(Json(DispatchResponse::from(report)))
}
