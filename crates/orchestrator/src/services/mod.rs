//! Worker traits, remote and in-memory implementations.
//!
//! Each worker is a separately deployed function performing one bounded
//! check for an order. The workflow only sees the traits; which
//! implementation backs each one is decided when the orchestrator is built.

pub mod http;
pub mod inventory;
pub mod payment;
pub mod shipping;
pub mod tax;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkerInvocationError;

pub use http::{HttpWorker, HttpWorkerConfig};
pub use inventory::{InMemoryInventoryWorker, InventoryRequest, InventoryResult, InventoryWorker};
pub use payment::{InMemoryPaymentWorker, PaymentRequest, PaymentResult, PaymentWorker};
pub use shipping::{InMemoryShippingWorker, ShippingRequest, ShippingResult, ShippingWorker};
pub use tax::{InMemoryTaxWorker, TaxRequest, TaxResult, TaxWorker};

/// Identity of one of the four workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerKind {
    Inventory,
    Payment,
    Shipping,
    Tax,
}

impl WorkerKind {
    /// All workers, in the order their results are evaluated.
    pub const ALL: [WorkerKind; 4] = [
        WorkerKind::Inventory,
        WorkerKind::Payment,
        WorkerKind::Shipping,
        WorkerKind::Tax,
    ];

    /// Name reported in logs and invocation errors.
    pub fn worker_name(&self) -> &'static str {
        match self {
            WorkerKind::Inventory => "InventoryCheck",
            WorkerKind::Payment => "PaymentValidation",
            WorkerKind::Shipping => "ShippingCalculation",
            WorkerKind::Tax => "TaxCalculation",
        }
    }

    /// Name of the durable step wrapping the invocation.
    pub fn step_name(&self) -> &'static str {
        match self {
            WorkerKind::Inventory => "check-inventory",
            WorkerKind::Payment => "validate-payment",
            WorkerKind::Shipping => "calculate-shipping",
            WorkerKind::Tax => "calculate-tax",
        }
    }

    /// Label used for the worker's entry in a failure list.
    pub fn label(&self) -> &'static str {
        match self {
            WorkerKind::Inventory => "inventory",
            WorkerKind::Payment => "payment",
            WorkerKind::Shipping => "shipping",
            WorkerKind::Tax => "tax",
        }
    }
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.worker_name())
    }
}

#[async_trait]
impl<W: InventoryWorker + ?Sized> InventoryWorker for Arc<W> {
    async fn check_inventory(
        &self,
        request: InventoryRequest,
    ) -> Result<InventoryResult, WorkerInvocationError> {
        (**self).check_inventory(request).await
    }
}

#[async_trait]
impl<W: PaymentWorker + ?Sized> PaymentWorker for Arc<W> {
    async fn validate_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentResult, WorkerInvocationError> {
        (**self).validate_payment(request).await
    }
}

#[async_trait]
impl<W: ShippingWorker + ?Sized> ShippingWorker for Arc<W> {
    async fn calculate_shipping(
        &self,
        request: ShippingRequest,
    ) -> Result<ShippingResult, WorkerInvocationError> {
        (**self).calculate_shipping(request).await
    }
}

#[async_trait]
impl<W: TaxWorker + ?Sized> TaxWorker for Arc<W> {
    async fn calculate_tax(&self, request: TaxRequest) -> Result<TaxResult, WorkerInvocationError> {
        (**self).calculate_tax(request).await
    }
}
