//! Order processing endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use domain::ValidationError;
use orchestrator::{
    InventoryWorker, InvocationContext, OrchestratorError, OrderOrchestrator, PaymentWorker,
    ShippingWorker, TaxWorker, WorkflowResponse, WorkflowState,
};
use serde_json::Value;
use tokio::time::Instant;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Orchestrator with its workers resolved at startup.
pub type SharedOrchestrator = OrderOrchestrator<
    Arc<dyn InventoryWorker>,
    Arc<dyn PaymentWorker>,
    Arc<dyn ShippingWorker>,
    Arc<dyn TaxWorker>,
>;

/// Which implementation backs the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    InMemory,
    Http,
    /// Workers supplied by the embedding code.
    Injected,
}

impl WorkerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerMode::InMemory => "in-memory",
            WorkerMode::Http => "http",
            WorkerMode::Injected => "injected",
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: SharedOrchestrator,
    pub function_name: String,
    pub worker_mode: WorkerMode,
}

/// POST /orders/process — run the fulfillment workflow on the request body.
///
/// The body is the raw order payload; an empty body is processed as a
/// missing payload. The workflow response is returned for every outcome,
/// including a body that is not JSON.
#[tracing::instrument(skip_all)]
pub async fn process(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(HeaderName, String); 1], Json<WorkflowResponse>) {
    let started = Instant::now();
    let request_id = request_id(&headers);

    let response = match parse_payload(&body) {
        Ok(payload) => {
            let invocation =
                InvocationContext::new(request_id.clone(), state.function_name.clone());
            state.orchestrator.process(payload, invocation).await
        }
        Err(err) => {
            tracing::warn!(request_id = %request_id, error = %err, "rejected request body");
            WorkflowResponse::failed(None, &OrchestratorError::from(err), started.elapsed())
        }
    };

    (
        status_for(&response),
        [(REQUEST_ID_HEADER, request_id)],
        Json(response),
    )
}

/// Returns the caller's request id, or a fresh one.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn parse_payload(body: &[u8]) -> Result<Option<Value>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| {
            ValidationError::new("event", format!("Request body is not valid JSON: {e}"))
        })
}

/// Maps a workflow outcome to an HTTP status.
pub fn status_for(response: &WorkflowResponse) -> StatusCode {
    match response.outcome() {
        WorkflowState::Confirmed => StatusCode::OK,
        WorkflowState::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
        _ => match response.error.as_ref().map(|e| e.name.as_str()) {
            Some("ValidationError") => StatusCode::BAD_REQUEST,
            Some("WorkerInvocationError") => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_id_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));
        assert_eq!(request_id(&headers), "req-42");
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let id = request_id(&HeaderMap::new());
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(b"").unwrap(), None);
        assert_eq!(parse_payload(b"  \n").unwrap(), None);
        assert_eq!(parse_payload(b"null").unwrap(), Some(Value::Null));

        let err = parse_payload(b"{oops").unwrap_err();
        assert_eq!(err.field, "event");
        assert!(err.message.starts_with("Request body is not valid JSON"));
    }

    #[test]
    fn test_unparseable_body_uses_failure_contract() {
        let err = parse_payload(b"{oops").unwrap_err();
        let response =
            WorkflowResponse::failed(None, &OrchestratorError::from(err), Default::default());

        assert_eq!(status_for(&response), StatusCode::BAD_REQUEST);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["name"], "ValidationError");
        assert_eq!(json["error"]["field"], "event");
        assert_eq!(json["message"], "Order processing failed");
        assert!(json["processingTimeMs"].is_u64());
        assert!(json["timestamp"].is_string());
    }
}
