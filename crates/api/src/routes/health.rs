//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub function_name: String,
    pub workers: &'static str,
}

/// GET /health — returns service health and which workers back the orchestrator.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        function_name: state.function_name.clone(),
        workers: state.worker_mode.as_str(),
    })
}
