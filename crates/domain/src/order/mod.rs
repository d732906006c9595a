//! Order model, validation and pricing.

mod model;
mod pricing;
mod validation;
mod value_objects;

pub use model::Order;
pub use pricing::subtotal;
pub use validation::validate;
pub use value_objects::{Address, Customer, CustomerId, LineItem, Money, ProductId};

use thiserror::Error;

/// A malformed or missing field in the incoming order payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Path of the offending field, e.g. `customer.address.state`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error for a field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while pricing an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// The subtotal does not fit in the money representation.
    #[error("Subtotal overflow at item {index}")]
    Overflow { index: usize },

    /// Adding shipping and tax to the subtotal overflowed.
    #[error("Order total overflow")]
    TotalOverflow,
}
