pub mod health;
pub mod reminder;
pub mod webhook;

use axum::Router;
use serde::Serialize;

use crate::state::AppState;

use courier_common::types::DeliveryReport;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(webhook::router())
        .merge(reminder::router())
        .with_state(state)
}

/// Canonical response for a completed dispatch cycle, partial failures
/// included.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub sent_to: usize,
    pub errors: usize,
}

impl From<DeliveryReport> for DispatchResponse {
    fn from(report: DeliveryReport) -> Self {
        Self {
            success: true,
            sent_to: report.succeeded,
            errors: report.failed,
        }
    }
}
