//! Shipping worker trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{Address, LineItem, Money, Order};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::WorkerKind;
use crate::error::WorkerInvocationError;

/// Payload sent to the shipping worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRequest {
    pub order_id: String,
    pub items: Vec<LineItem>,
    pub address: Address,
}

impl ShippingRequest {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.order_id().to_string(),
            items: order.items().to_vec(),
            address: order.customer().address.clone(),
        }
    }
}

/// Shipping worker response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingResult {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_cost: Option<Money>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ShippingResult {
    pub fn quoted(cost: Money, estimated_delivery_days: u32, carrier: impl Into<String>) -> Self {
        Self {
            success: true,
            shipping_cost: Some(cost),
            estimated_delivery_days: Some(estimated_delivery_days),
            carrier: Some(carrier.into()),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Quotes shipping cost and delivery estimate for an order.
#[async_trait]
pub trait ShippingWorker: Send + Sync {
    async fn calculate_shipping(
        &self,
        request: ShippingRequest,
    ) -> Result<ShippingResult, WorkerInvocationError>;
}

#[derive(Debug)]
struct InMemoryShippingState {
    base_cost: Money,
    per_unit: Money,
    estimated_days: u32,
    carrier: String,
    unserviceable: HashSet<String>,
    invocations: usize,
    latency: Duration,
    fail_invocation: Option<String>,
    canned: Option<ShippingResult>,
}

impl Default for InMemoryShippingState {
    fn default() -> Self {
        Self {
            base_cost: Money::from_cents(500),
            per_unit: Money::zero(),
            estimated_days: 5,
            carrier: "Standard Ground".to_string(),
            unserviceable: HashSet::new(),
            invocations: 0,
            latency: Duration::ZERO,
            fail_invocation: None,
            canned: None,
        }
    }
}

/// In-memory shipping worker.
///
/// Quotes `base_cost + per_unit * total_quantity`, $5.00 flat by default.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingWorker {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a worker quoting a flat cost.
    pub fn with_flat_cost(cost: Money) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryShippingState {
                base_cost: cost,
                ..InMemoryShippingState::default()
            })),
        }
    }

    pub async fn set_rates(&self, base_cost: Money, per_unit: Money) {
        let mut state = self.state.write().await;
        state.base_cost = base_cost;
        state.per_unit = per_unit;
    }

    /// Refuses to ship to the given state.
    pub async fn set_unserviceable(&self, state_code: &str) {
        self.state
            .write()
            .await
            .unserviceable
            .insert(state_code.to_string());
    }

    pub async fn set_fail_invocation(&self, error_type: Option<&str>) {
        self.state.write().await.fail_invocation = error_type.map(str::to_string);
    }

    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = latency;
    }

    pub async fn set_canned_response(&self, response: Option<ShippingResult>) {
        self.state.write().await.canned = response;
    }

    pub async fn invocation_count(&self) -> usize {
        self.state.read().await.invocations
    }
}

#[async_trait]
impl ShippingWorker for InMemoryShippingWorker {
    async fn calculate_shipping(
        &self,
        request: ShippingRequest,
    ) -> Result<ShippingResult, WorkerInvocationError> {
        let latency = {
            let mut state = self.state.write().await;
            state.invocations += 1;
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.read().await;

        if let Some(error_type) = &state.fail_invocation {
            return Err(WorkerInvocationError::application(
                WorkerKind::Shipping,
                error_type,
                "carrier rate service unavailable",
            ));
        }
        if let Some(canned) = &state.canned {
            return Ok(canned.clone());
        }

        if state.unserviceable.contains(&request.address.state) {
            return Ok(ShippingResult::failed(format!(
                "Shipping not available to {}",
                request.address.state
            )));
        }

        let units: u64 = request.items.iter().map(|item| u64::from(item.quantity)).sum();
        let cost = i64::try_from(units)
            .ok()
            .and_then(|units| state.per_unit.cents().checked_mul(units))
            .map(Money::from_cents)
            .and_then(|per_unit| state.base_cost.checked_add(per_unit));
        let Some(cost) = cost else {
            return Ok(ShippingResult::failed(format!(
                "Shipping cost out of range for {units} units"
            )));
        };

        Ok(ShippingResult::quoted(
            cost,
            state.estimated_days,
            state.carrier.clone(),
        ))
    }
}
