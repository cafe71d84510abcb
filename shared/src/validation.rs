//! Validation utilities for clinic stock management
//!
//! Every check returns a static message so the caller can attach the field
//! name and surface it however it likes.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::models::{CancellationReason, OrderLine};

/// True when an optional text value is missing or only whitespace
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

// ============================================================================
// Stock Item Validations
// ============================================================================

/// Validate an item name is present
pub fn validate_item_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name is required");
    }
    if name.trim().chars().count() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

/// Validate a stock count (quantity or minimum quantity)
pub fn validate_stock_count(count: i64) -> Result<(), &'static str> {
    if count < 0 {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

/// Validate a unit price
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Validate a movement quantity
pub fn validate_movement_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

// ============================================================================
// Purchase Order Validations
// ============================================================================

/// Validate the supplier of an order
pub fn validate_supplier_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Supplier is required");
    }
    Ok(())
}

/// Validate the lines of a new order
pub fn validate_order_lines(lines: &[OrderLine]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("An order needs at least one line");
    }
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.ordered_qty <= 0 {
            return Err("Ordered quantity must be positive");
        }
        if line.unit_price < Decimal::ZERO {
            return Err("Unit price cannot be negative");
        }
        if !seen.insert(line.item_id) {
            return Err("An item may appear on only one line");
        }
    }
    Ok(())
}

/// Validate a cancellation reason; `other` needs an explanation
pub fn validate_cancellation(
    reason: CancellationReason,
    custom_reason: Option<&str>,
) -> Result<(), &'static str> {
    if reason == CancellationReason::Other && is_blank(custom_reason) {
        return Err("A reason must be given when cancelling for 'other'");
    }
    Ok(())
}

/// Validate an invoice number is present
pub fn validate_invoice_number(invoice_number: &str) -> Result<(), &'static str> {
    if invoice_number.trim().is_empty() {
        return Err("Invoice number is required");
    }
    Ok(())
}

/// Validate a received quantity; zero is a full shortfall
pub fn validate_received_qty(received: i64) -> Result<(), &'static str> {
    if received < 0 {
        return Err("Received quantity cannot be negative");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemUnit;
    use uuid::Uuid;

    fn line(item_id: Uuid, ordered_qty: i64) -> OrderLine {
        OrderLine {
            item_id,
            ordered_qty,
            unit: ItemUnit::Box,
            unit_price: Decimal::new(1250, 2),
        }
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("   ")));
        assert!(!is_blank(Some("short delivery")));
    }

    #[test]
    fn test_validate_item_name() {
        assert!(validate_item_name("Gauze 7.5cm").is_ok());
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name("  ").is_err());
        assert!(validate_item_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_counts_and_prices() {
        assert!(validate_stock_count(0).is_ok());
        assert!(validate_stock_count(-1).is_err());
        assert!(validate_unit_price(Decimal::ZERO).is_ok());
        assert!(validate_unit_price(Decimal::new(-1, 2)).is_err());
        assert!(validate_movement_quantity(1).is_ok());
        assert!(validate_movement_quantity(0).is_err());
    }

    #[test]
    fn test_validate_order_lines() {
        let a = Uuid::new_v4();
        assert!(validate_order_lines(&[line(a, 100)]).is_ok());
        assert_eq!(
            validate_order_lines(&[]),
            Err("An order needs at least one line")
        );
        assert!(validate_order_lines(&[line(a, 0)]).is_err());
        assert!(validate_order_lines(&[line(a, -3)]).is_err());
        assert_eq!(
            validate_order_lines(&[line(a, 1), line(a, 2)]),
            Err("An item may appear on only one line")
        );
    }

    #[test]
    fn test_validate_cancellation() {
        assert!(validate_cancellation(CancellationReason::Duplicate, None).is_ok());
        assert!(validate_cancellation(CancellationReason::Other, Some("")).is_err());
        assert!(validate_cancellation(CancellationReason::Other, None).is_err());
        assert!(validate_cancellation(CancellationReason::Other, Some("duplicate")).is_ok());
    }

    #[test]
    fn test_validate_receipt_fields() {
        assert!(validate_invoice_number("NF-1").is_ok());
        assert!(validate_invoice_number(" ").is_err());
        assert!(validate_received_qty(0).is_ok());
        assert!(validate_received_qty(-1).is_err());
    }
}
