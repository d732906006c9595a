//! End-to-end tests of the order fulfillment workflow.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::ExecutionId;
use domain::Money;
use execution::{InMemoryCheckpointStore, StepRetryPolicy};
use orchestrator::{
    InMemoryInventoryWorker, InMemoryPaymentWorker, InMemoryShippingWorker, InMemoryTaxWorker,
    InventoryRequest, InventoryResult, InventoryWorker, InvocationContext, OrchestratorConfig,
    OrderOrchestrator, PaymentRequest, PaymentResult, PaymentWorker, ShippingRequest,
    ShippingResult, ShippingWorker, TaxRequest, TaxResult, TaxWorker, WorkerInvocationError,
    WorkflowState,
};
use serde_json::{Value, json};
use tokio::sync::Barrier;

type InMemoryOrchestrator = OrderOrchestrator<
    InMemoryInventoryWorker,
    InMemoryPaymentWorker,
    InMemoryShippingWorker,
    InMemoryTaxWorker,
>;

struct Harness {
    inventory: InMemoryInventoryWorker,
    payment: InMemoryPaymentWorker,
    shipping: InMemoryShippingWorker,
    tax: InMemoryTaxWorker,
}

impl Harness {
    fn new() -> Self {
        Self {
            inventory: InMemoryInventoryWorker::new(),
            payment: InMemoryPaymentWorker::new(),
            shipping: InMemoryShippingWorker::new(),
            tax: InMemoryTaxWorker::new(),
        }
    }

    fn orchestrator(&self) -> InMemoryOrchestrator {
        OrderOrchestrator::new(
            self.inventory.clone(),
            self.payment.clone(),
            self.shipping.clone(),
            self.tax.clone(),
            OrchestratorConfig::default().with_finalize_delay(Duration::ZERO),
        )
    }

    async fn invocation_counts(&self) -> [usize; 4] {
        [
            self.inventory.invocation_count().await,
            self.payment.invocation_count().await,
            self.shipping.invocation_count().await,
            self.tax.invocation_count().await,
        ]
    }
}

fn invocation() -> InvocationContext {
    InvocationContext::new("req-test", "order-orchestrator")
}

fn ord_1() -> Value {
    json!({
        "orderId": "ORD-1",
        "items": [{ "productId": "P1", "price": 10, "quantity": 2 }],
        "customer": { "id": "C1", "address": { "state": "WA" } }
    })
}

#[tokio::test]
async fn test_end_to_end_confirmation() {
    let harness = Harness::new();
    harness
        .shipping
        .set_rates(Money::from_cents(400), Money::zero())
        .await;
    harness.tax.set_rate("WA", 0.1).await;

    let response = harness
        .orchestrator()
        .process(Some(ord_1()), invocation())
        .await;

    assert!(response.success);
    assert_eq!(response.outcome(), WorkflowState::Confirmed);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["orderId"], "ORD-1");
    assert_eq!(
        json["message"],
        "Order processed successfully with parallel execution"
    );
    assert_eq!(json["result"]["status"], "CONFIRMED");
    assert_eq!(
        json["result"]["totals"],
        json!({ "subtotal": 20, "shipping": 4, "tax": 2, "total": 26, "currency": "USD" })
    );
    assert_eq!(json["result"]["inventory"]["reservationId"], "RES-0001");
    assert_eq!(json["result"]["payment"]["authorizationCode"], "AUTH-0001");
    assert_eq!(json["result"]["tax"]["jurisdiction"], "WA");
    assert!(json["timestamp"].is_string());
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_totals_add_shipping_and_tax() {
    let harness = Harness::new();
    harness.tax.set_rate("WA", 0.15).await;

    let response = harness
        .orchestrator()
        .process(Some(ord_1()), invocation())
        .await;

    let totals = response.result.unwrap().totals;
    assert_eq!(totals.subtotal, Money::from_cents(2000));
    assert_eq!(totals.shipping, Money::from_cents(500));
    assert_eq!(totals.tax, Money::from_cents(300));
    assert_eq!(totals.total, Money::from_cents(2800));
    assert_eq!(totals.currency, "USD");
}

#[tokio::test]
async fn test_subtotal_is_recomputed_from_items() {
    let harness = Harness::new();
    let mut payload = ord_1();
    payload["subtotal"] = json!(1);
    payload["items"] = json!([
        { "productId": "P1", "price": 10, "quantity": 2 },
        { "productId": "P2", "price": 2.5, "quantity": 4 }
    ]);

    let response = harness
        .orchestrator()
        .process(Some(payload), invocation())
        .await;

    assert_eq!(
        response.result.unwrap().totals.subtotal,
        Money::from_cents(3000)
    );
    assert_eq!(
        harness.payment.authorized_amount("ORD-1").await,
        Some(Money::from_cents(3000))
    );
}

#[tokio::test]
async fn test_single_failure_rejects_with_single_entry() {
    let harness = Harness::new();
    harness.inventory.set_out_of_stock("P1").await;

    let response = harness
        .orchestrator()
        .process(Some(ord_1()), invocation())
        .await;

    assert!(!response.success);
    assert_eq!(response.outcome(), WorkflowState::Rejected);
    assert_eq!(response.message, "Order validation failed");
    assert_eq!(response.order_id.as_deref(), Some("ORD-1"));
    assert!(response.result.is_none());

    let failures = response.failures.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].step, "inventory");
    assert_eq!(failures[0].reason, "Insufficient stock for P1");

    // All four workers still ran.
    assert_eq!(harness.invocation_counts().await, [1, 1, 1, 1]);
}

#[tokio::test]
async fn test_semantic_flags_report_inventory_and_payment() {
    let harness = Harness::new();
    harness
        .inventory
        .set_canned_response(Some(InventoryResult {
            success: true,
            available: Some(false),
            ..InventoryResult::default()
        }))
        .await;
    harness
        .payment
        .set_canned_response(Some(PaymentResult {
            success: true,
            valid: Some(false),
            ..PaymentResult::default()
        }))
        .await;

    let response = harness
        .orchestrator()
        .process(Some(ord_1()), invocation())
        .await;

    let failures = response.failures.unwrap();
    let steps: Vec<_> = failures.iter().map(|f| f.step.as_str()).collect();
    assert_eq!(steps, vec!["inventory", "payment"]);
    assert_eq!(failures[0].reason, "Items not available");
    assert_eq!(failures[1].reason, "Payment validation failed");
}

#[tokio::test]
async fn test_rejection_lists_failures_in_fixed_order() {
    let harness = Harness::new();
    harness.tax.set_unsupported("WA").await;
    harness.shipping.set_unserviceable("WA").await;
    harness.payment.set_declined(true).await;

    let response = harness
        .orchestrator()
        .process(Some(ord_1()), invocation())
        .await;

    let steps: Vec<_> = response
        .failures
        .unwrap()
        .into_iter()
        .map(|f| f.step)
        .collect();
    assert_eq!(steps, vec!["payment", "shipping", "tax"]);
}

#[tokio::test]
async fn test_validation_failure_invokes_no_worker() {
    let harness = Harness::new();
    let mut payload = ord_1();
    payload["customer"]["address"] = json!({ "city": "Seattle" });

    let response = harness
        .orchestrator()
        .process(Some(payload), invocation())
        .await;

    assert!(!response.success);
    assert_eq!(response.outcome(), WorkflowState::Failed);
    assert_eq!(response.message, "Order processing failed");

    let error = response.error.unwrap();
    assert_eq!(error.name, "ValidationError");
    assert_eq!(error.field.as_deref(), Some("customer.address.state"));
    assert_eq!(
        error.message,
        "customer.address.state is required for tax calculation"
    );
    assert_eq!(harness.invocation_counts().await, [0, 0, 0, 0]);
}

#[tokio::test]
async fn test_each_required_field_is_named_and_no_worker_runs() {
    let cases: [(&str, fn(&mut Value)); 4] = [
        ("orderId", |p| {
            p.as_object_mut().unwrap().remove("orderId");
        }),
        ("items", |p| {
            p.as_object_mut().unwrap().remove("items");
        }),
        ("customer.id", |p| {
            p["customer"].as_object_mut().unwrap().remove("id");
        }),
        ("customer.address.state", |p| {
            p["customer"]["address"]
                .as_object_mut()
                .unwrap()
                .remove("state");
        }),
    ];

    for (field, strip) in cases {
        let harness = Harness::new();
        let mut payload = ord_1();
        strip(&mut payload);

        let response = harness
            .orchestrator()
            .process(Some(payload), invocation())
            .await;

        assert_eq!(response.outcome(), WorkflowState::Failed, "field {field}");
        let error = response.error.unwrap();
        assert_eq!(error.name, "ValidationError");
        assert_eq!(error.field.as_deref(), Some(field));
        assert_eq!(
            harness.invocation_counts().await,
            [0, 0, 0, 0],
            "workers invoked when {field} is missing"
        );
    }
}

#[tokio::test]
async fn test_large_quantities_do_not_escape_as_panic() {
    let harness = Harness::new();
    let payload = json!({
        "orderId": "ORD-BULK",
        "items": [
            { "productId": "P1", "price": 1, "quantity": 4_000_000_000u64 },
            { "productId": "P2", "price": 1, "quantity": 4_000_000_000u64 }
        ],
        "customer": { "id": "C1", "address": { "state": "WA" } }
    });

    let response = harness
        .orchestrator()
        .process(Some(payload), invocation())
        .await;

    assert_eq!(response.outcome(), WorkflowState::Confirmed);
    let totals = response.result.unwrap().totals;
    assert_eq!(totals.subtotal, Money::from_cents(800_000_000_000));
    assert_eq!(totals.shipping, Money::from_cents(500));
    assert_eq!(harness.invocation_counts().await, [1, 1, 1, 1]);
}

#[tokio::test]
async fn test_step_retry_applies_to_workers_only() {
    let harness = Harness::new();
    harness.tax.set_fail_invocation(Some("Throttled")).await;
    let orchestrator = OrderOrchestrator::new(
        harness.inventory.clone(),
        harness.payment.clone(),
        harness.shipping.clone(),
        harness.tax.clone(),
        OrchestratorConfig::default()
            .with_finalize_delay(Duration::ZERO)
            .with_step_retry(StepRetryPolicy {
                max_attempts: 3,
                min_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            }),
    );

    let response = orchestrator.process(Some(ord_1()), invocation()).await;

    assert_eq!(response.outcome(), WorkflowState::Failed);
    assert_eq!(harness.invocation_counts().await, [1, 1, 1, 3]);
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let harness = Harness::new();
    let orchestrator = OrderOrchestrator::new(
        harness.inventory.clone(),
        harness.payment.clone(),
        harness.shipping.clone(),
        harness.tax.clone(),
        OrchestratorConfig::default().with_step_retry(StepRetryPolicy {
            max_attempts: 3,
            min_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
        }),
    );
    let mut payload = ord_1();
    payload.as_object_mut().unwrap().remove("orderId");

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.process(Some(payload), invocation()),
    )
    .await
    .expect("validation failure was retried with backoff");

    let error = response.error.unwrap();
    assert_eq!(error.name, "ValidationError");
    assert_eq!(error.field.as_deref(), Some("orderId"));
}

#[tokio::test]
async fn test_missing_payload_names_event() {
    let harness = Harness::new();

    let response = harness.orchestrator().process(None, invocation()).await;

    let error = response.error.unwrap();
    assert_eq!(error.field.as_deref(), Some("event"));
    assert_eq!(response.order_id, None);
}

#[tokio::test]
async fn test_worker_fault_reports_worker_name() {
    let harness = Harness::new();
    harness.tax.set_fail_invocation(Some("Unhandled")).await;

    let response = harness
        .orchestrator()
        .process(Some(ord_1()), invocation())
        .await;

    assert_eq!(response.outcome(), WorkflowState::Failed);
    assert_eq!(response.order_id.as_deref(), Some("ORD-1"));
    let error = response.error.unwrap();
    assert_eq!(error.name, "WorkerInvocationError");
    assert_eq!(error.worker_name.as_deref(), Some("TaxCalculation"));
    assert_eq!(error.message, "TaxCalculation worker error: Unhandled");
    assert_eq!(harness.invocation_counts().await, [1, 1, 1, 1]);
}

#[tokio::test]
async fn test_repeated_invocation_is_idempotent() {
    let harness = Harness::new();
    harness.tax.set_rate("WA", 0.1).await;
    let orchestrator = harness.orchestrator();

    let first = orchestrator.process(Some(ord_1()), invocation()).await;
    let second = orchestrator.process(Some(ord_1()), invocation()).await;

    let mut first = first.result.unwrap();
    let second = second.result.unwrap();
    first.confirmed_at = second.confirmed_at;
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(harness.inventory.reservation_count().await, 1);
    assert_eq!(harness.payment.authorization_count().await, 1);
}

#[tokio::test]
async fn test_resumed_execution_replays_completed_steps() {
    let harness = Harness::new();
    harness.shipping.set_fail_invocation(Some("Unhandled")).await;
    let store = InMemoryCheckpointStore::new();
    let orchestrator = harness
        .orchestrator()
        .with_checkpoint_store(Arc::new(store.clone()));
    let execution_id = ExecutionId::new();

    let failed = orchestrator
        .process(Some(ord_1()), invocation().with_execution_id(execution_id))
        .await;
    assert_eq!(failed.outcome(), WorkflowState::Failed);

    harness.shipping.set_fail_invocation(None).await;
    let resumed = orchestrator
        .process(Some(ord_1()), invocation().with_execution_id(execution_id))
        .await;

    assert!(resumed.success);
    assert_eq!(harness.invocation_counts().await, [1, 1, 2, 1]);
    assert_eq!(
        store.steps(execution_id).await,
        vec![
            "calculate-final-totals",
            "calculate-subtotal",
            "finalize-order",
            "validate-input",
            "validate-results",
            "workers/inventory/check-inventory",
            "workers/payment/validate-payment",
            "workers/shipping/calculate-shipping",
            "workers/tax/calculate-tax",
        ]
    );
}

#[tokio::test]
async fn test_finalize_delay_is_a_durable_wait() {
    let harness = Harness::new();
    let store = InMemoryCheckpointStore::new();
    let orchestrator = OrderOrchestrator::new(
        harness.inventory.clone(),
        harness.payment.clone(),
        harness.shipping.clone(),
        harness.tax.clone(),
        OrchestratorConfig::default().with_finalize_delay(Duration::from_millis(10)),
    )
    .with_checkpoint_store(Arc::new(store.clone()));
    let execution_id = ExecutionId::new();

    let response = orchestrator
        .process(Some(ord_1()), invocation().with_execution_id(execution_id))
        .await;

    assert!(response.success);
    assert!(store.has_checkpoint(execution_id, "finalize-delay").await);
}

/// Worker that blocks until all four workers have been called.
#[derive(Clone)]
struct BarrierWorker {
    barrier: Arc<Barrier>,
    started: Arc<AtomicUsize>,
}

impl BarrierWorker {
    async fn arrive(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.barrier.wait().await;
    }
}

#[async_trait]
impl InventoryWorker for BarrierWorker {
    async fn check_inventory(
        &self,
        _request: InventoryRequest,
    ) -> Result<InventoryResult, WorkerInvocationError> {
        self.arrive().await;
        Ok(InventoryResult::reserved("RES-B"))
    }
}

#[async_trait]
impl PaymentWorker for BarrierWorker {
    async fn validate_payment(
        &self,
        _request: PaymentRequest,
    ) -> Result<PaymentResult, WorkerInvocationError> {
        self.arrive().await;
        Ok(PaymentResult::authorized("AUTH-B"))
    }
}

#[async_trait]
impl ShippingWorker for BarrierWorker {
    async fn calculate_shipping(
        &self,
        _request: ShippingRequest,
    ) -> Result<ShippingResult, WorkerInvocationError> {
        self.arrive().await;
        Ok(ShippingResult::quoted(Money::from_cents(500), 2, "UPS"))
    }
}

#[async_trait]
impl TaxWorker for BarrierWorker {
    async fn calculate_tax(
        &self,
        _request: TaxRequest,
    ) -> Result<TaxResult, WorkerInvocationError> {
        self.arrive().await;
        Ok(TaxResult::assessed(Money::from_cents(300), 0.15, "WA"))
    }
}

#[tokio::test]
async fn test_all_workers_start_before_any_resolves() {
    let worker = BarrierWorker {
        barrier: Arc::new(Barrier::new(4)),
        started: Arc::new(AtomicUsize::new(0)),
    };
    let orchestrator = OrderOrchestrator::new(
        worker.clone(),
        worker.clone(),
        worker.clone(),
        worker.clone(),
        OrchestratorConfig::default().with_finalize_delay(Duration::ZERO),
    );

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.process(Some(ord_1()), invocation()),
    )
    .await
    .expect("workers were not dispatched concurrently");

    assert!(response.success);
    assert_eq!(worker.started.load(Ordering::SeqCst), 4);
    assert_eq!(
        response.result.unwrap().totals.total,
        Money::from_cents(2800)
    );
}
