//! Input validator.

use serde_json::{Map, Value};

use super::ValidationError;
use super::model::Order;
use super::value_objects::{Address, Customer, CustomerId, LineItem, Money, ProductId};

/// Validates a raw order payload and builds an [`Order`].
///
/// Checks run in a fixed order and stop at the first failure:
/// payload present, `orderId`, `items`, `customer.id`,
/// `customer.address.state`, then the shape of each line item.
pub fn validate(payload: Option<&Value>) -> Result<Order, ValidationError> {
    let event = match payload {
        Some(value) if !value.is_null() => value,
        _ => {
            return Err(ValidationError::new(
                "event",
                "Event object is null or undefined",
            ));
        }
    };

    let order_id = non_empty_str(event.get("orderId"))
        .ok_or_else(|| ValidationError::new("orderId", "orderId is required"))?;

    let raw_items = event
        .get("items")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| {
            ValidationError::new("items", "items array is required and must not be empty")
        })?;

    let raw_customer = event.get("customer");
    let customer_id = non_empty_str(raw_customer.and_then(|c| c.get("id")))
        .ok_or_else(|| ValidationError::new("customer.id", "customer.id is required"))?;

    let raw_address = raw_customer.and_then(|c| c.get("address"));
    let state = non_empty_str(raw_address.and_then(|a| a.get("state"))).ok_or_else(|| {
        ValidationError::new(
            "customer.address.state",
            "customer.address.state is required for tax calculation",
        )
    })?;

    let items = raw_items
        .iter()
        .enumerate()
        .map(|(index, raw)| line_item(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let customer = Customer {
        id: CustomerId::new(customer_id),
        address: Address {
            state: state.to_string(),
            extra: remaining_fields(raw_address, &["state"]),
        },
        extra: remaining_fields(raw_customer, &["id", "address"]),
    };

    tracing::info!(
        order_id,
        item_count = items.len(),
        customer_id,
        "Event validation successful"
    );

    Ok(Order::new(order_id.to_string(), items, customer))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn remaining_fields(value: Option<&Value>, known: &[&str]) -> Map<String, Value> {
    value
        .and_then(Value::as_object)
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| !known.contains(&key.as_str()))
                .map(|(key, v)| (key.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn line_item(index: usize, raw: &Value) -> Result<LineItem, ValidationError> {
    let product_id = non_empty_str(raw.get("productId")).ok_or_else(|| {
        ValidationError::new(
            format!("items[{index}].productId"),
            "productId is required",
        )
    })?;

    let price = raw
        .get("price")
        .and_then(Value::as_f64)
        .filter(|p| *p >= 0.0)
        .and_then(Money::from_major)
        .ok_or_else(|| {
            ValidationError::new(
                format!("items[{index}].price"),
                "price must be a non-negative number",
            )
        })?;

    let quantity = raw
        .get("quantity")
        .and_then(Value::as_u64)
        .filter(|q| *q > 0)
        .and_then(|q| u32::try_from(q).ok())
        .ok_or_else(|| {
            ValidationError::new(
                format!("items[{index}].quantity"),
                "quantity must be a positive integer",
            )
        })?;

    Ok(LineItem {
        product_id: ProductId::new(product_id),
        price,
        quantity,
        extra: remaining_fields(Some(raw), &["productId", "price", "quantity"]),
    })
}
