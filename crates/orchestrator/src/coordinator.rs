//! Order orchestrator driving the fulfillment workflow end to end.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::ExecutionId;
use domain::{Money, Order};
use execution::{CheckpointStore, ExecutionContext, StepRetryPolicy};
use serde_json::Value;

use crate::aggregator::{
    OrderConfirmation, OrderTotals, ResultValidation, confirmation, final_totals,
    validate_results,
};
use crate::dispatcher::WorkerDispatcher;
use crate::error::{OrchestratorError, Result};
use crate::order_fulfillment::{
    STEP_CALCULATE_FINAL_TOTALS, STEP_CALCULATE_SUBTOTAL, STEP_FINALIZE_ORDER,
    STEP_VALIDATE_INPUT, STEP_VALIDATE_RESULTS, WAIT_BEFORE_FINALIZE,
};
use crate::response::WorkflowResponse;
use crate::services::{InventoryWorker, PaymentWorker, ShippingWorker, TaxWorker};
use crate::state::WorkflowState;

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Currency reported in the order totals.
    pub currency: String,

    /// Durable pause before finalization. Zero skips the pause.
    pub finalize_delay: Duration,

    /// Retry policy applied to the worker invocation steps. Validation,
    /// pricing and aggregation are deterministic and always run once.
    pub step_retry: StepRetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            finalize_delay: Duration::from_secs(1),
            step_retry: StepRetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_finalize_delay(mut self, finalize_delay: Duration) -> Self {
        self.finalize_delay = finalize_delay;
        self
    }

    pub fn with_step_retry(mut self, step_retry: StepRetryPolicy) -> Self {
        self.step_retry = step_retry;
        self
    }
}

/// Identity of one invocation, attached to every log line it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub function_name: String,

    /// Execution whose checkpoints this invocation reads and writes.
    pub execution_id: ExecutionId,
}

impl InvocationContext {
    /// Creates a context for a fresh execution.
    pub fn new(request_id: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            function_name: function_name.into(),
            execution_id: ExecutionId::new(),
        }
    }

    /// Resumes an existing execution.
    pub fn with_execution_id(mut self, execution_id: ExecutionId) -> Self {
        self.execution_id = execution_id;
        self
    }
}

/// Runs the order fulfillment workflow.
///
/// Workflow: validate → price → dispatch the four workers in parallel →
/// aggregate → finalize. Each stage is a named step of the execution
/// context, so with a checkpoint store attached a re-run of the same
/// execution skips every stage that already completed.
pub struct OrderOrchestrator<I, P, S, T>
where
    I: InventoryWorker,
    P: PaymentWorker,
    S: ShippingWorker,
    T: TaxWorker,
{
    dispatcher: WorkerDispatcher<I, P, S, T>,
    config: OrchestratorConfig,
    store: Option<Arc<dyn CheckpointStore>>,
}

impl<I, P, S, T> OrderOrchestrator<I, P, S, T>
where
    I: InventoryWorker,
    P: PaymentWorker,
    S: ShippingWorker,
    T: TaxWorker,
{
    /// Creates an orchestrator whose steps are not persisted.
    pub fn new(inventory: I, payment: P, shipping: S, tax: T, config: OrchestratorConfig) -> Self {
        Self {
            dispatcher: WorkerDispatcher::new(inventory, payment, shipping, tax),
            config,
            store: None,
        }
    }

    /// Checkpoints step outputs to `store`.
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Processes one order payload.
    ///
    /// Never fails: validation errors, worker faults and runtime errors are
    /// all reported through the returned [`WorkflowResponse`].
    #[tracing::instrument(
        name = "order_workflow",
        skip_all,
        fields(
            request_id = %invocation.request_id,
            function_name = %invocation.function_name,
            execution_id = %invocation.execution_id,
        )
    )]
    pub async fn process(
        &self,
        payload: Option<Value>,
        invocation: InvocationContext,
    ) -> WorkflowResponse {
        metrics::counter!("order_workflows_total").increment(1);
        let started = Instant::now();
        tracing::info!("order processing started");

        let ctx = self.context(invocation.execution_id);
        let mut state = WorkflowState::default();

        let response = match self.run(&ctx, payload.as_ref(), &mut state, started).await {
            Ok(response) => response,
            Err(err) => {
                transition(&mut state, WorkflowState::Failed);
                tracing::error!(
                    error = %err,
                    error_name = err.name(),
                    field = err.field(),
                    worker_name = err.worker_name(),
                    processing_time_ms = started.elapsed().as_millis() as u64,
                    "order processing failed"
                );
                WorkflowResponse::failed(payload_order_id(payload.as_ref()), &err, started.elapsed())
            }
        };

        match response.outcome() {
            WorkflowState::Confirmed => metrics::counter!("order_workflows_confirmed").increment(1),
            WorkflowState::Rejected => metrics::counter!("order_workflows_rejected").increment(1),
            _ => metrics::counter!("order_workflows_failed").increment(1),
        }
        metrics::histogram!("order_workflow_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        response
    }

    async fn run(
        &self,
        ctx: &ExecutionContext,
        payload: Option<&Value>,
        state: &mut WorkflowState,
        started: Instant,
    ) -> Result<WorkflowResponse> {
        // 1. Validate input
        let order: Order = ctx
            .step(STEP_VALIDATE_INPUT, || async move {
                domain::validate(payload).map_err(OrchestratorError::from)
            })
            .await?;
        let order = &order;

        // 2. Compute subtotal
        transition(state, WorkflowState::Pricing);
        let subtotal: Money = ctx
            .step(STEP_CALCULATE_SUBTOTAL, || async move {
                domain::subtotal(order.items()).map_err(OrchestratorError::from)
            })
            .await?;
        tracing::info!(
            order_id = order.order_id(),
            subtotal = %subtotal,
            item_count = order.item_count(),
            "subtotal calculated"
        );

        // 3. Invoke the workers in parallel
        transition(state, WorkflowState::Dispatching);
        let worker_ctx = ctx.clone().with_retry_policy(self.config.step_retry);
        let results = self
            .dispatcher
            .dispatch(&worker_ctx, order, subtotal)
            .await?;
        let results = &results;

        // 4. Check the combined results
        transition(state, WorkflowState::Aggregating);
        let validation: ResultValidation = ctx
            .step(STEP_VALIDATE_RESULTS, || async move {
                Ok::<_, OrchestratorError>(validate_results(results))
            })
            .await?;

        if !validation.valid {
            tracing::warn!(
                order_id = order.order_id(),
                failures = ?validation.failures,
                "validation failures detected"
            );
            transition(state, WorkflowState::Rejected);
            return Ok(WorkflowResponse::rejected(
                order.order_id(),
                validation.failures,
                started.elapsed(),
            ));
        }
        tracing::info!(order_id = order.order_id(), "all validations passed");

        // 5. Final totals
        let currency = self.config.currency.as_str();
        let totals: OrderTotals = ctx
            .step(STEP_CALCULATE_FINAL_TOTALS, || async move {
                final_totals(subtotal, results, currency)
            })
            .await?;
        tracing::info!(
            order_id = order.order_id(),
            subtotal = %totals.subtotal,
            shipping = %totals.shipping,
            tax = %totals.tax,
            total = %totals.total,
            "final totals calculated"
        );

        // 6. Pause, then finalize
        if !self.config.finalize_delay.is_zero() {
            ctx.wait(WAIT_BEFORE_FINALIZE, self.config.finalize_delay)
                .await?;
        }

        let confirmed: OrderConfirmation = ctx
            .step(STEP_FINALIZE_ORDER, || {
                let totals = totals.clone();
                async move {
                    Ok::<_, OrchestratorError>(confirmation(
                        order.order_id(),
                        results,
                        totals,
                        Utc::now(),
                    ))
                }
            })
            .await?;
        transition(state, WorkflowState::Confirmed);

        tracing::info!(
            order_id = order.order_id(),
            status = %state,
            processing_time_ms = started.elapsed().as_millis() as u64,
            "order processing complete"
        );
        Ok(WorkflowResponse::confirmed(confirmed, started.elapsed()))
    }

    fn context(&self, execution_id: ExecutionId) -> ExecutionContext {
        match &self.store {
            Some(store) => ExecutionContext::with_store(execution_id, store.clone()),
            None => ExecutionContext::local(execution_id),
        }
    }
}

fn transition(state: &mut WorkflowState, next: WorkflowState) {
    if !state.can_transition_to(next) {
        tracing::warn!(from = %state, to = %next, "unexpected workflow transition");
    }
    tracing::debug!(from = %state, to = %next, "workflow state changed");
    *state = next;
}

/// Order id from the raw payload, when it carries a usable one.
fn payload_order_id(payload: Option<&Value>) -> Option<String> {
    payload
        .and_then(|p| p.get("orderId"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.currency, "USD");
        assert_eq!(config.finalize_delay, Duration::from_secs(1));
        assert_eq!(config.step_retry.max_attempts, 1);
    }

    #[test]
    fn test_invocation_context_gets_fresh_execution() {
        let a = InvocationContext::new("req-1", "order-orchestrator");
        let b = InvocationContext::new("req-1", "order-orchestrator");
        assert_ne!(a.execution_id, b.execution_id);

        let resumed = b.clone().with_execution_id(a.execution_id);
        assert_eq!(resumed.execution_id, a.execution_id);
    }

    #[test]
    fn test_payload_order_id() {
        assert_eq!(
            payload_order_id(Some(&json!({ "orderId": "ORD-7" }))).as_deref(),
            Some("ORD-7")
        );
        assert_eq!(payload_order_id(Some(&json!({ "orderId": "" }))), None);
        assert_eq!(payload_order_id(Some(&json!({ "orderId": 7 }))), None);
        assert_eq!(payload_order_id(None), None);
    }

    #[test]
    fn test_transition_updates_state() {
        let mut state = WorkflowState::default();
        transition(&mut state, WorkflowState::Pricing);
        transition(&mut state, WorkflowState::Failed);
        assert_eq!(state, WorkflowState::Failed);
    }
}
