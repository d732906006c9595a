//! Inventory worker trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{LineItem, Order, ProductId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::WorkerKind;
use crate::error::WorkerInvocationError;

/// Payload sent to the inventory worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRequest {
    pub order_id: String,
    pub items: Vec<LineItem>,
}

impl InventoryRequest {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id().to_string(),
            items: order.items().to_vec(),
        }
    }
}

/// Inventory worker response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResult {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InventoryResult {
    /// All items reserved.
    pub fn reserved(reservation_id: impl Into<String>) -> Self {
        Self {
            success: true,
            available: Some(true),
            reservation_id: Some(reservation_id.into()),
            message: None,
        }
    }

    /// The check ran but some items are not in stock.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            success: true,
            available: Some(false),
            reservation_id: None,
            message: Some(message.into()),
        }
    }
}

/// Checks stock and reserves the order's items.
#[async_trait]
pub trait InventoryWorker: Send + Sync {
    async fn check_inventory(
        &self,
        request: InventoryRequest,
    ) -> Result<InventoryResult, WorkerInvocationError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    reservations: HashMap<String, String>,
    out_of_stock: HashSet<ProductId>,
    next_id: u32,
    invocations: usize,
    latency: Duration,
    fail_invocation: Option<String>,
    canned: Option<InventoryResult>,
}

/// In-memory inventory worker.
///
/// Reservations are keyed by order ID, so repeating a check for the same
/// order returns the original reservation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryWorker {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a product as out of stock.
    pub async fn set_out_of_stock(&self, product_id: impl Into<ProductId>) {
        self.state
            .write()
            .await
            .out_of_stock
            .insert(product_id.into());
    }

    /// Makes every invocation fail with the given error type.
    pub async fn set_fail_invocation(&self, error_type: Option<&str>) {
        self.state.write().await.fail_invocation = error_type.map(str::to_string);
    }

    /// Delays every response.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = latency;
    }

    /// Returns this response verbatim instead of computing one.
    pub async fn set_canned_response(&self, response: Option<InventoryResult>) {
        self.state.write().await.canned = response;
    }

    pub async fn invocation_count(&self) -> usize {
        self.state.read().await.invocations
    }

    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    pub async fn reservation_for(&self, order_id: &str) -> Option<String> {
        self.state.read().await.reservations.get(order_id).cloned()
    }
}

#[async_trait]
impl InventoryWorker for InMemoryInventoryWorker {
    async fn check_inventory(
        &self,
        request: InventoryRequest,
    ) -> Result<InventoryResult, WorkerInvocationError> {
        let latency = {
            let mut state = self.state.write().await;
            state.invocations += 1;
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().await;

        if let Some(error_type) = &state.fail_invocation {
            return Err(WorkerInvocationError::application(
                WorkerKind::Inventory,
                error_type,
                "inventory service unavailable",
            ));
        }
        if let Some(canned) = &state.canned {
            return Ok(canned.clone());
        }

        if let Some(missing) = request
            .items
            .iter()
            .find(|item| state.out_of_stock.contains(&item.product_id))
        {
            return Ok(InventoryResult::unavailable(format!(
                "Insufficient stock for {}",
                missing.product_id
            )));
        }

        if let Some(existing) = state.reservations.get(&request.order_id) {
            return Ok(InventoryResult::reserved(existing.clone()));
        }

        state.next_id += 1;
        let reservation_id = format!("RES-{:04}", state.next_id);
        state
            .reservations
            .insert(request.order_id, reservation_id.clone());

        Ok(InventoryResult::reserved(reservation_id))
    }
}
