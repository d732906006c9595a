//! Tax worker trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{Money, Order};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::WorkerKind;
use crate::error::WorkerInvocationError;

/// Payload sent to the tax worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRequest {
    pub order_id: String,
    pub subtotal: Money,

    /// Tax jurisdiction, taken from the customer's address.
    pub state: String,
}

impl TaxRequest {
    pub fn for_order(order: &Order, subtotal: Money) -> Self {
        Self {
            order_id: order.order_id().to_string(),
            subtotal,
            state: order.state().to_string(),
        }
    }
}

/// Tax worker response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResult {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Money>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaxResult {
    pub fn assessed(amount: Money, rate: f64, jurisdiction: impl Into<String>) -> Self {
        Self {
            success: true,
            tax_amount: Some(amount),
            tax_rate: Some(rate),
            jurisdiction: Some(jurisdiction.into()),
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

/// Computes sales tax for an order subtotal.
#[async_trait]
pub trait TaxWorker: Send + Sync {
    async fn calculate_tax(&self, request: TaxRequest) -> Result<TaxResult, WorkerInvocationError>;
}

#[derive(Debug, Default)]
struct InMemoryTaxState {
    rates: HashMap<String, f64>,
    default_rate: f64,
    unsupported: HashSet<String>,
    invocations: usize,
    latency: Duration,
    fail_invocation: Option<String>,
    canned: Option<TaxResult>,
}

/// In-memory tax worker with a rate table keyed by state.
///
/// States without an entry are taxed at the default rate, zero unless set.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaxWorker {
    state: Arc<RwLock<InMemoryTaxState>>,
}

impl InMemoryTaxWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a worker applying `rate` to every state.
    pub fn with_default_rate(rate: f64) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryTaxState {
                default_rate: rate,
                ..InMemoryTaxState::default()
            })),
        }
    }

    /// Creates a worker with a rate table; other states are untaxed.
    pub fn with_rates<K: Into<String>>(rates: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryTaxState {
                rates: rates
                    .into_iter()
                    .map(|(state, rate)| (state.into(), rate))
                    .collect(),
                ..InMemoryTaxState::default()
            })),
        }
    }

    pub async fn set_rate(&self, state_code: &str, rate: f64) {
        self.state
            .write()
            .await
            .rates
            .insert(state_code.to_string(), rate);
    }

    /// Reports the state as outside every known jurisdiction.
    pub async fn set_unsupported(&self, state_code: &str) {
        self.state
            .write()
            .await
            .unsupported
            .insert(state_code.to_string());
    }

    pub async fn set_fail_invocation(&self, error_type: Option<&str>) {
        self.state.write().await.fail_invocation = error_type.map(str::to_string);
    }

    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = latency;
    }

    pub async fn set_canned_response(&self, response: Option<TaxResult>) {
        self.state.write().await.canned = response;
    }

    pub async fn invocation_count(&self) -> usize {
        self.state.read().await.invocations
    }
}

#[async_trait]
impl TaxWorker for InMemoryTaxWorker {
    async fn calculate_tax(&self, request: TaxRequest) -> Result<TaxResult, WorkerInvocationError> {
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
                WorkerKind::Tax,
                error_type,
                "tax rate lookup failed",
            ));
        }
        if let Some(canned) = &state.canned {
            return Ok(canned.clone());
        }

        if state.unsupported.contains(&request.state) {
            return Ok(TaxResult::failed(format!(
                "Unsupported tax jurisdiction: {}",
                request.state
            )));
        }

        let rate = state
            .rates
            .get(&request.state)
            .copied()
            .unwrap_or(state.default_rate);
        // Round half away from zero to the nearest cent.
        let amount = Money::from_cents((request.subtotal.cents() as f64 * rate).round() as i64);

        Ok(TaxResult::assessed(amount, rate, request.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(state: &str, cents: i64) -> TaxRequest {
        TaxRequest {
            order_id: "ORD-1".to_string(),
            subtotal: Money::from_cents(cents),
            state: state.to_string(),
        }
    }

    #[tokio::test]
    async fn test_rate_by_state() {
        let worker = InMemoryTaxWorker::new();
        worker.set_rate("WA", 0.1).await;

        let wa = worker.calculate_tax(request("WA", 2000)).await.unwrap();
        assert!(wa.success);
        assert_eq!(wa.tax_amount, Some(Money::from_cents(200)));
        assert_eq!(wa.tax_rate, Some(0.1));
        assert_eq!(wa.jurisdiction.as_deref(), Some("WA"));

        let or = worker.calculate_tax(request("OR", 2000)).await.unwrap();
        assert_eq!(or.tax_amount, Some(Money::zero()));
    }

    #[tokio::test]
    async fn test_rate_table() {
        let worker = InMemoryTaxWorker::with_rates([("WA", 0.1), ("TX", 0.0625)]);

        let tx = worker.calculate_tax(request("TX", 1000)).await.unwrap();
        assert_eq!(tx.tax_amount, Some(Money::from_cents(63)));
        let nv = worker.calculate_tax(request("NV", 1000)).await.unwrap();
        assert_eq!(nv.tax_amount, Some(Money::zero()));
    }

    #[tokio::test]
    async fn test_amount_rounds_to_cent() {
        let worker = InMemoryTaxWorker::with_default_rate(0.065);

        let result = worker.calculate_tax(request("CA", 999)).await.unwrap();
        assert_eq!(result.tax_amount, Some(Money::from_cents(65)));
    }

    #[tokio::test]
    async fn test_unsupported_jurisdiction() {
        let worker = InMemoryTaxWorker::new();
        worker.set_unsupported("PR").await;

        let result = worker.calculate_tax(request("PR", 1000)).await.unwrap();
        assert!(!result.success);
        assert_eq!(
            result.message.as_deref(),
            Some("Unsupported tax jurisdiction: PR")
        );
    }

    #[tokio::test]
    async fn test_canned_response_wins() {
        let worker = InMemoryTaxWorker::new();
        worker
            .set_canned_response(Some(TaxResult::assessed(Money::from_cents(300), 0.15, "NY")))
            .await;

        let result = worker.calculate_tax(request("WA", 2000)).await.unwrap();
        assert_eq!(result.tax_amount, Some(Money::from_cents(300)));
        assert_eq!(worker.invocation_count().await, 1);
    }
}
