//! Workflow state machine.

use serde::{Deserialize, Serialize};

/// The state of one order workflow execution.
///
/// State transitions:
/// ```text
/// Validating ──► Pricing ──► Dispatching ──► Aggregating ──┬──► Confirmed
///                                                          └──► Rejected
/// ```
/// Any non-terminal state may move to `Failed` when a fault aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    /// The payload is being validated.
    #[default]
    Validating,

    /// The subtotal is being computed.
    Pricing,

    /// The four workers are running.
    Dispatching,

    /// Worker results are being checked and totals computed.
    Aggregating,

    /// The order was confirmed (terminal state).
    Confirmed,

    /// A worker reported a business failure (terminal state).
    Rejected,

    /// Validation or a worker invocation raised an error (terminal state).
    Failed,
}

impl WorkflowState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Confirmed | WorkflowState::Rejected | WorkflowState::Failed
        )
    }

    /// Returns true if the workflow may move from this state to `next`.
    pub fn can_transition_to(&self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        match (self, next) {
            (Validating, Pricing)
            | (Pricing, Dispatching)
            | (Dispatching, Aggregating)
            | (Aggregating, Confirmed)
            | (Aggregating, Rejected) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Validating => "VALIDATING",
            WorkflowState::Pricing => "PRICING",
            WorkflowState::Dispatching => "DISPATCHING",
            WorkflowState::Aggregating => "AGGREGATING",
            WorkflowState::Confirmed => "CONFIRMED",
            WorkflowState::Rejected => "REJECTED",
            WorkflowState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
