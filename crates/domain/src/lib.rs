//! Domain layer for the order orchestrator.
//!
//! This crate provides:
//! - The order data model (`Order`, `LineItem`, `Customer`, `Address`, `Money`)
//! - The input validator turning a raw payload into a validated `Order`
//! - The pricing calculator computing the order subtotal

pub mod order;

pub use order::{
    Address, Customer, CustomerId, LineItem, Money, Order, PricingError, ProductId,
    ValidationError, subtotal, validate,
};
