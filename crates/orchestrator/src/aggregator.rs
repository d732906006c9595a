//! Result aggregation: failure detection, final totals and the confirmation record.
//!
//! These are pure functions over the collected [`WorkerResults`]; the
//! coordinator runs each of them inside a durable step.

use chrono::{DateTime, Utc};
use domain::{Money, PricingError};
use serde::{Deserialize, Serialize};

use crate::dispatcher::WorkerResults;
use crate::error::Result;
use crate::services::WorkerKind;

const REASON_INVENTORY: &str = "Items not available";
const REASON_PAYMENT: &str = "Payment validation failed";
const REASON_SHIPPING: &str = "Shipping calculation failed";
const REASON_TAX: &str = "Tax calculation failed";

/// One worker that reported a business failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Worker label: `inventory`, `payment`, `shipping` or `tax`.
    pub step: String,
    pub reason: String,
}

impl StepFailure {
    fn new(worker: WorkerKind, message: Option<&str>, default_reason: &str) -> Self {
        let reason = message
            .filter(|m| !m.is_empty())
            .unwrap_or(default_reason)
            .to_string();
        Self {
            step: worker.label().to_string(),
            reason,
        }
    }
}

/// Outcome of checking the combined worker results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultValidation {
    pub valid: bool,
    pub failures: Vec<StepFailure>,
}

/// Checks every worker result and lists the ones that failed.
///
/// Workers are evaluated in the fixed order inventory, payment, shipping,
/// tax so the failure list is reproducible. Inventory and payment must also
/// set their `available`/`valid` flag; shipping and tax are judged on
/// `success` alone.
pub fn validate_results(results: &WorkerResults) -> ResultValidation {
    let mut failures = Vec::new();

    let inventory = &results.inventory;
    if !inventory.success || inventory.available != Some(true) {
        failures.push(StepFailure::new(
            WorkerKind::Inventory,
            inventory.message.as_deref(),
            REASON_INVENTORY,
        ));
    }

    let payment = &results.payment;
    if !payment.success || payment.valid != Some(true) {
        failures.push(StepFailure::new(
            WorkerKind::Payment,
            payment.message.as_deref(),
            REASON_PAYMENT,
        ));
    }

    // No secondary flag exists for shipping or tax; a successful response
    // with no cost or amount is accepted and priced as zero.
    if !results.shipping.success {
        failures.push(StepFailure::new(
            WorkerKind::Shipping,
            results.shipping.message.as_deref(),
            REASON_SHIPPING,
        ));
    }

    if !results.tax.success {
        failures.push(StepFailure::new(
            WorkerKind::Tax,
            results.tax.message.as_deref(),
            REASON_TAX,
        ));
    }

    ResultValidation {
        valid: failures.is_empty(),
        failures,
    }
}

/// Final order totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    pub currency: String,
}

/// Computes `subtotal + shipping + tax`. A missing cost or amount counts as zero.
pub fn final_totals(subtotal: Money, results: &WorkerResults, currency: &str) -> Result<OrderTotals> {
    let shipping = results.shipping.shipping_cost.unwrap_or_default();
    let tax = results.tax.tax_amount.unwrap_or_default();
    let total = subtotal
        .checked_add(shipping)
        .and_then(|sum| sum.checked_add(tax))
        .ok_or(PricingError::TotalOverflow)?;

    Ok(OrderTotals {
        subtotal,
        shipping,
        tax,
        total,
        currency: currency.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Confirmed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

/// The confirmation record of a fulfilled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    pub status: OrderStatus,
    pub inventory: InventorySummary,
    pub payment: PaymentSummary,
    pub shipping: ShippingSummary,
    pub tax: TaxSummary,
    pub totals: OrderTotals,
    pub confirmed_at: DateTime<Utc>,
}

/// Assembles the confirmation for an order whose results all passed.
pub fn confirmation(
    order_id: &str,
    results: &WorkerResults,
    totals: OrderTotals,
    confirmed_at: DateTime<Utc>,
) -> OrderConfirmation {
    OrderConfirmation {
        order_id: order_id.to_string(),
        status: OrderStatus::Confirmed,
        inventory: InventorySummary {
            available: results.inventory.available,
            reservation_id: results.inventory.reservation_id.clone(),
        },
        payment: PaymentSummary {
            valid: results.payment.valid,
            authorization_code: results.payment.authorization_code.clone(),
        },
        shipping: ShippingSummary {
            cost: results.shipping.shipping_cost,
            estimated_days: results.shipping.estimated_delivery_days,
            carrier: results.shipping.carrier.clone(),
        },
        tax: TaxSummary {
            amount: results.tax.tax_amount,
            rate: results.tax.tax_rate,
            jurisdiction: results.tax.jurisdiction.clone(),
        },
        totals,
        confirmed_at,
    }
}
