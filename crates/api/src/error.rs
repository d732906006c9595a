//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised outside the order workflow.
///
/// Workflow outcomes, including an unreadable request body, are not
/// `ApiError`s; they are returned as a workflow response with a matching
/// status code.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build {worker} client: {message}")]
    WorkerClient {
        worker: &'static str,
        message: String,
    },
}
