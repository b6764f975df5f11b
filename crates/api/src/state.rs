//! Shared application state for the Axum API server.

use std::sync::Arc;

use courier_engine::pipeline::DispatchPipeline;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DispatchPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<DispatchPipeline>) -> Self {
        Self { pipeline }
    }
}
