//! Pricing calculator.

use super::PricingError;
use super::value_objects::{LineItem, Money};

/// Computes the order subtotal as the sum of `price * quantity`.
///
/// The subtotal is always recomputed from the items; any total supplied by
/// the caller is ignored.
pub fn subtotal(items: &[LineItem]) -> Result<Money, PricingError> {
    items
        .iter()
        .enumerate()
        .try_fold(Money::zero(), |acc, (index, item)| {
            item.subtotal()
                .and_then(|line| acc.checked_add(line))
                .ok_or(PricingError::Overflow { index })
        })
}
