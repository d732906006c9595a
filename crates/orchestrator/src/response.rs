//! The single response shape returned for every workflow outcome.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::{OrderConfirmation, StepFailure};
use crate::error::OrchestratorError;
use crate::order_fulfillment::{MESSAGE_CONFIRMED, MESSAGE_FAILED, MESSAGE_REJECTED};
use crate::state::WorkflowState;

/// Description of the error that aborted a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub name: String,
    pub message: String,

    /// Offending input field, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Failing worker, for worker invocation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_name: Option<String>,
}

impl From<&OrchestratorError> for ErrorDetail {
    fn from(err: &OrchestratorError) -> Self {
        Self {
            name: err.name().to_string(),
            message: err.to_string(),
            field: err.field().map(str::to_string),
            worker_name: err.worker_name().map(str::to_string),
        }
    }
}

/// Workflow output.
///
/// Success, business rejection and faults all share this shape; callers
/// branch on `success` and on which of `result`, `failures` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OrderConfirmation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<StepFailure>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,

    pub message: String,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl WorkflowResponse {
    pub fn confirmed(result: OrderConfirmation, elapsed: Duration) -> Self {
        Self {
            success: true,
            order_id: Some(result.order_id.clone()),
            result: Some(result),
            failures: None,
            error: None,
            message: MESSAGE_CONFIRMED.to_string(),
            processing_time_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    pub fn rejected(order_id: impl Into<String>, failures: Vec<StepFailure>, elapsed: Duration) -> Self {
        Self {
            success: false,
            order_id: Some(order_id.into()),
            result: None,
            failures: Some(failures),
            error: None,
            message: MESSAGE_REJECTED.to_string(),
            processing_time_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(order_id: Option<String>, err: &OrchestratorError, elapsed: Duration) -> Self {
        Self {
            success: false,
            order_id,
            result: None,
            failures: None,
            error: Some(ErrorDetail::from(err)),
            message: MESSAGE_FAILED.to_string(),
            processing_time_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }

    /// The terminal state this response reports.
    pub fn outcome(&self) -> WorkflowState {
        if self.success {
            WorkflowState::Confirmed
        } else if self.failures.is_some() {
            WorkflowState::Rejected
        } else {
            WorkflowState::Failed
        }
    }
}
