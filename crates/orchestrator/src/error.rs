//! Workflow error types.

use domain::{PricingError, ValidationError};
use execution::ExecutionError;
use thiserror::Error;

use crate::services::WorkerKind;

/// A worker failed to respond or reported an application-level error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkerInvocationError {
    pub worker: WorkerKind,
    pub message: String,

    /// Underlying transport fault or the worker's error payload.
    pub cause: Option<String>,
}

impl WorkerInvocationError {
    /// The worker could not be reached or its response could not be read.
    pub fn transport(worker: WorkerKind, cause: impl Into<String>) -> Self {
        Self {
            worker,
            message: format!("Failed to invoke {} worker", worker.worker_name()),
            cause: Some(cause.into()),
        }
    }

    /// The worker ran but its execution raised an error.
    pub fn application(worker: WorkerKind, error_type: &str, cause: impl Into<String>) -> Self {
        Self {
            worker,
            message: format!("{} worker error: {error_type}", worker.worker_name()),
            cause: Some(cause.into()),
        }
    }
}

/// Errors that abort a workflow attempt.
///
/// Business rejections (a worker answering "not available") are not errors;
/// they are reported through [`ResultValidation`](crate::ResultValidation).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The order payload is malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The order total could not be computed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// A worker invocation failed.
    #[error(transparent)]
    Worker(#[from] WorkerInvocationError),

    /// The execution runtime failed (checkpointing, cancellation).
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A worker branch completed without producing its result.
    #[error("No result received from {} worker", .0.worker_name())]
    MissingWorkerResult(WorkerKind),
}

impl OrchestratorError {
    /// Stable error name reported to callers.
    pub fn name(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "ValidationError",
            OrchestratorError::Pricing(_) => "PricingError",
            OrchestratorError::Worker(_) | OrchestratorError::MissingWorkerResult(_) => {
                "WorkerInvocationError"
            }
            OrchestratorError::Execution(_) => "ExecutionError",
        }
    }

    /// The offending field, for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            OrchestratorError::Validation(e) => Some(&e.field),
            _ => None,
        }
    }

    /// The failing worker, for worker invocation errors.
    pub fn worker_name(&self) -> Option<&'static str> {
        match self {
            OrchestratorError::Worker(e) => Some(e.worker.worker_name()),
            OrchestratorError::MissingWorkerResult(kind) => Some(kind.worker_name()),
            _ => None,
        }
    }
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
