//! Parallel order fulfillment workflow.
//!
//! The workflow runs these stages, each as a named durable step:
//! 1. Validate the incoming order payload
//! 2. Compute the subtotal from the line items
//! 3. Invoke the inventory, payment, shipping and tax workers concurrently
//! 4. Validate the combined worker results and compute final totals
//! 5. Pause, then assemble the order confirmation
//!
//! Any worker reporting a failure rejects the order before finalization.
//! Every outcome, including errors, is returned as a [`WorkflowResponse`].

pub mod aggregator;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod order_fulfillment;
pub mod response;
pub mod services;
pub mod state;

pub use aggregator::{
    InventorySummary, OrderConfirmation, OrderStatus, OrderTotals, PaymentSummary,
    ResultValidation, ShippingSummary, StepFailure, TaxSummary,
};
pub use coordinator::{InvocationContext, OrchestratorConfig, OrderOrchestrator};
pub use dispatcher::{WorkerDispatcher, WorkerResults};
pub use error::{OrchestratorError, WorkerInvocationError};
pub use response::{ErrorDetail, WorkflowResponse};
pub use services::{
    HttpWorker, HttpWorkerConfig, InMemoryInventoryWorker, InMemoryPaymentWorker,
    InMemoryShippingWorker, InMemoryTaxWorker, InventoryRequest, InventoryResult,
    InventoryWorker, PaymentRequest, PaymentResult, PaymentWorker, ShippingRequest,
    ShippingResult, ShippingWorker, TaxRequest, TaxResult, TaxWorker, WorkerKind,
};
pub use state::WorkflowState;
