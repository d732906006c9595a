//! Concurrent dispatch of the four workers.

use std::future::Future;
use std::time::Instant;

use domain::{Money, Order};
use execution::{Branch, ExecutionContext, branch};
use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result, WorkerInvocationError};
use crate::order_fulfillment::PARALLEL_WORKERS;
use crate::services::{
    InventoryRequest, InventoryResult, InventoryWorker, PaymentRequest, PaymentResult,
    PaymentWorker, ShippingRequest, ShippingResult, ShippingWorker, TaxRequest, TaxResult,
    TaxWorker, WorkerKind,
};

/// The four worker results of one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResults {
    pub inventory: InventoryResult,
    pub payment: PaymentResult,
    pub shipping: ShippingResult,
    pub tax: TaxResult,
}

/// Output of a single worker branch.
#[derive(Debug)]
enum WorkerReport {
    Inventory(InventoryResult),
    Payment(PaymentResult),
    Shipping(ShippingResult),
    Tax(TaxResult),
}

impl WorkerResults {
    /// Collects branch outputs given in evaluation order.
    ///
    /// The first error in that order wins, regardless of which branch
    /// finished first.
    fn from_reports(reports: Vec<Result<WorkerReport>>) -> Result<Self> {
        let mut inventory = None;
        let mut payment = None;
        let mut shipping = None;
        let mut tax = None;

        for report in reports {
            match report? {
                WorkerReport::Inventory(r) => inventory = Some(r),
                WorkerReport::Payment(r) => payment = Some(r),
                WorkerReport::Shipping(r) => shipping = Some(r),
                WorkerReport::Tax(r) => tax = Some(r),
            }
        }

        Ok(Self {
            inventory: inventory.ok_or(OrchestratorError::MissingWorkerResult(WorkerKind::Inventory))?,
            payment: payment.ok_or(OrchestratorError::MissingWorkerResult(WorkerKind::Payment))?,
            shipping: shipping.ok_or(OrchestratorError::MissingWorkerResult(WorkerKind::Shipping))?,
            tax: tax.ok_or(OrchestratorError::MissingWorkerResult(WorkerKind::Tax))?,
        })
    }
}

/// Fans an order out to the inventory, payment, shipping and tax workers.
///
/// Each worker only receives its own slice of the order. All four calls are
/// issued together and awaited as a group; a failing worker does not cancel
/// its siblings.
pub struct WorkerDispatcher<I, P, S, T>
where
    I: InventoryWorker,
    P: PaymentWorker,
    S: ShippingWorker,
    T: TaxWorker,
{
    inventory: I,
    payment: P,
    shipping: S,
    tax: T,
}

impl<I, P, S, T> WorkerDispatcher<I, P, S, T>
where
    I: InventoryWorker,
    P: PaymentWorker,
    S: ShippingWorker,
    T: TaxWorker,
{
    pub fn new(inventory: I, payment: P, shipping: S, tax: T) -> Self {
        Self {
            inventory,
            payment,
            shipping,
            tax,
        }
    }

    /// Invokes all four workers concurrently, each inside its own durable step.
    pub async fn dispatch(
        &self,
        ctx: &ExecutionContext,
        order: &Order,
        subtotal: Money,
    ) -> Result<WorkerResults> {
        let inventory_request = InventoryRequest::for_order(order);
        let payment_request = PaymentRequest::for_order(order, subtotal);
        let shipping_request = ShippingRequest::for_order(order);
        let tax_request = TaxRequest::for_order(order, subtotal);

        tracing::info!(
            order_id = order.order_id(),
            worker_count = WorkerKind::ALL.len(),
            "dispatching workers"
        );

        let branches: Vec<(&str, Branch<'_, Result<WorkerReport>>)> = vec![
            (
                WorkerKind::Inventory.label(),
                branch(move |child: ExecutionContext| async move {
                    let request = &inventory_request;
                    child
                        .step(WorkerKind::Inventory.step_name(), || {
                            invoke(
                                WorkerKind::Inventory,
                                self.inventory.check_inventory(request.clone()),
                            )
                        })
                        .await
                        .map(WorkerReport::Inventory)
                }),
            ),
            (
                WorkerKind::Payment.label(),
                branch(move |child: ExecutionContext| async move {
                    let request = &payment_request;
                    child
                        .step(WorkerKind::Payment.step_name(), || {
                            invoke(
                                WorkerKind::Payment,
                                self.payment.validate_payment(request.clone()),
                            )
                        })
                        .await
                        .map(WorkerReport::Payment)
                }),
            ),
            (
                WorkerKind::Shipping.label(),
                branch(move |child: ExecutionContext| async move {
                    let request = &shipping_request;
                    child
                        .step(WorkerKind::Shipping.step_name(), || {
                            invoke(
                                WorkerKind::Shipping,
                                self.shipping.calculate_shipping(request.clone()),
                            )
                        })
                        .await
                        .map(WorkerReport::Shipping)
                }),
            ),
            (
                WorkerKind::Tax.label(),
                branch(move |child: ExecutionContext| async move {
                    let request = &tax_request;
                    child
                        .step(WorkerKind::Tax.step_name(), || {
                            invoke(WorkerKind::Tax, self.tax.calculate_tax(request.clone()))
                        })
                        .await
                        .map(WorkerReport::Tax)
                }),
            ),
        ];

        let reports = ctx.parallel(PARALLEL_WORKERS, branches).await;
        let results = WorkerResults::from_reports(reports)?;

        tracing::info!(order_id = order.order_id(), "parallel execution completed");
        Ok(results)
    }
}

/// Awaits one worker call, recording logs and metrics for it.
async fn invoke<R, Fut>(kind: WorkerKind, call: Fut) -> Result<R>
where
    Fut: Future<Output = std::result::Result<R, WorkerInvocationError>>,
{
    let worker = kind.worker_name();
    let started = Instant::now();
    metrics::counter!("worker_invocations_total", "worker" => worker).increment(1);
    tracing::info!(worker, "invoking worker");

    match call.await {
        Ok(result) => {
            tracing::info!(
                worker,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "worker invocation successful"
            );
            Ok(result)
        }
        Err(err) => {
            metrics::counter!("worker_invocation_failures_total", "worker" => worker).increment(1);
            tracing::error!(
                worker,
                error = %err,
                cause = err.cause.as_deref().unwrap_or_default(),
                "worker invocation failed"
            );
            Err(err.into())
        }
    }
}
