//! The validated order.

use serde::{Deserialize, Serialize};

use super::value_objects::{Customer, LineItem};

/// An order that has passed input validation.
///
/// Built only by [`validate`](super::validate) (or deserialized from a
/// checkpoint of a validated order), so `items` is never empty and the
/// customer always carries a tax state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    order_id: String,
    items: Vec<LineItem>,
    customer: Customer,
}

impl Order {
    pub(crate) fn new(order_id: String, items: Vec<LineItem>, customer: Customer) -> Self {
        Self {
            order_id,
            items,
            customer,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    /// The tax jurisdiction key (`customer.address.state`).
    pub fn state(&self) -> &str {
        &self.customer.address.state
    }
}
