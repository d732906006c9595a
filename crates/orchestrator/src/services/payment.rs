//! Payment worker trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{Customer, Money, Order};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::WorkerKind;
use crate::error::WorkerInvocationError;

/// Payload sent to the payment worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: String,
    pub customer: Customer,

    /// Amount to authorize: the order subtotal.
    pub amount: Money,
}

impl PaymentRequest {
    pub fn for_order(order: &Order, amount: Money) -> Self {
        Self {
            order_id: order.order_id().to_string(),
            customer: order.customer().clone(),
            amount,
        }
    }
}

/// Payment worker response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PaymentResult {
    pub fn authorized(authorization_code: impl Into<String>) -> Self {
        Self {
            success: true,
            valid: Some(true),
            authorization_code: Some(authorization_code.into()),
            message: None,
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: true,
            valid: Some(false),
            authorization_code: None,
            message: Some(message.into()),
        }
    }
}

/// Validates and authorizes payment for an order.
#[async_trait]
pub trait PaymentWorker: Send + Sync {
    async fn validate_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentResult, WorkerInvocationError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    authorizations: HashMap<String, (String, Money)>,
    credit_limit: Option<Money>,
    declined: bool,
    next_id: u32,
    invocations: usize,
    latency: Duration,
    fail_invocation: Option<String>,
    canned: Option<PaymentResult>,
}

/// In-memory payment worker.
///
/// Authorizations are keyed by order ID.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentWorker {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines every payment.
    pub async fn set_declined(&self, declined: bool) {
        self.state.write().await.declined = declined;
    }

    /// Declines amounts above the limit.
    pub async fn set_credit_limit(&self, limit: Option<Money>) {
        self.state.write().await.credit_limit = limit;
    }

    pub async fn set_fail_invocation(&self, error_type: Option<&str>) {
        self.state.write().await.fail_invocation = error_type.map(str::to_string);
    }

    pub async fn set_latency(&self, latency: Duration) {
        self.state.write().await.latency = latency;
    }

    pub async fn set_canned_response(&self, response: Option<PaymentResult>) {
        self.state.write().await.canned = response;
    }

    pub async fn invocation_count(&self) -> usize {
        self.state.read().await.invocations
    }

    pub async fn authorization_count(&self) -> usize {
        self.state.read().await.authorizations.len()
    }

    /// Returns the amount authorized for an order.
    pub async fn authorized_amount(&self, order_id: &str) -> Option<Money> {
        self.state
            .read()
            .await
            .authorizations
            .get(order_id)
            .map(|(_, amount)| *amount)
    }
}

#[async_trait]
impl PaymentWorker for InMemoryPaymentWorker {
    async fn validate_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentResult, WorkerInvocationError> {
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
                WorkerKind::Payment,
                error_type,
                "payment processor unavailable",
            ));
        }
        if let Some(canned) = &state.canned {
            return Ok(canned.clone());
        }

        if state.declined {
            return Ok(PaymentResult::declined("Payment declined"));
        }
        if let Some(limit) = state.credit_limit
            && request.amount > limit
        {
            return Ok(PaymentResult::declined(format!(
                "Amount {} exceeds credit limit {}",
                request.amount, limit
            )));
        }

        if let Some((code, _)) = state.authorizations.get(&request.order_id) {
            return Ok(PaymentResult::authorized(code.clone()));
        }

        state.next_id += 1;
        let code = format!("AUTH-{:04}", state.next_id);
        state
            .authorizations
            .insert(request.order_id, (code.clone(), request.amount));

        Ok(PaymentResult::authorized(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Address;

    fn request(order_id: &str, cents: i64) -> PaymentRequest {
        PaymentRequest {
            order_id: order_id.to_string(),
            customer: Customer::new("C1", Address::in_state("WA")),
            amount: Money::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_authorize() {
        let worker = InMemoryPaymentWorker::new();

        let result = worker.validate_payment(request("ORD-1", 5000)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.valid, Some(true));
        assert_eq!(result.authorization_code.as_deref(), Some("AUTH-0001"));
        assert_eq!(
            worker.authorized_amount("ORD-1").await,
            Some(Money::from_cents(5000))
        );
    }

    #[tokio::test]
    async fn test_repeat_authorization_is_idempotent() {
        let worker = InMemoryPaymentWorker::new();

        let first = worker.validate_payment(request("ORD-1", 5000)).await.unwrap();
        let second = worker.validate_payment(request("ORD-1", 5000)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(worker.authorization_count().await, 1);
        assert_eq!(worker.invocation_count().await, 2);
    }

    #[tokio::test]
    async fn test_declined() {
        let worker = InMemoryPaymentWorker::new();
        worker.set_declined(true).await;

        let result = worker.validate_payment(request("ORD-1", 5000)).await.unwrap();
        assert!(result.success);
        assert_eq!(result.valid, Some(false));
        assert_eq!(worker.authorization_count().await, 0);
    }

    #[tokio::test]
    async fn test_credit_limit() {
        let worker = InMemoryPaymentWorker::new();
        worker
            .set_credit_limit(Some(Money::from_cents(1000)))
            .await;

        let over = worker.validate_payment(request("ORD-1", 1001)).await.unwrap();
        let under = worker.validate_payment(request("ORD-2", 1000)).await.unwrap();

        assert_eq!(over.valid, Some(false));
        assert_eq!(
            over.message.as_deref(),
            Some("Amount $10.01 exceeds credit limit $10.00")
        );
        assert_eq!(under.valid, Some(true));
    }

    #[tokio::test]
    async fn test_fail_invocation() {
        let worker = InMemoryPaymentWorker::new();
        worker.set_fail_invocation(Some("Runtime.Timeout")).await;

        let err = worker
            .validate_payment(request("ORD-1", 5000))
            .await
            .unwrap_err();
        assert_eq!(err.worker, WorkerKind::Payment);
    }
}
