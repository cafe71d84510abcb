//! WebAssembly module for Clinic Stock Management
//!
//! Provides client-side computation for:
//! - Receipt line classification
//! - Checking whether a receipt needs reconciliation notes
//! - Offline form validation

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn js_error(msg: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&msg.to_string())
}

/// Classify one received line: "ok", "partial" or "excess"
#[wasm_bindgen]
pub fn classify_receipt_line(ordered_qty: i64, received_qty: i64) -> String {
    reconciliation::classify(ordered_qty, received_qty).to_string()
}

/// Reconcile a receipt against the order lines, both given as JSON arrays.
///
/// Returns the classified lines as JSON, in order-line sequence.
#[wasm_bindgen]
pub fn reconcile_receipt(order_lines_json: &str, receipts_json: &str) -> Result<String, JsValue> {
    let lines: Vec<OrderLine> = serde_json::from_str(order_lines_json)
        .map_err(|e| js_error(format!("Invalid order lines JSON: {}", e)))?;
    let receipts: Vec<LineReceipt> = serde_json::from_str(receipts_json)
        .map_err(|e| js_error(format!("Invalid receipts JSON: {}", e)))?;

    let reconciled = reconciliation::reconcile(&lines, &receipts).map_err(js_error)?;
    serde_json::to_string(&reconciled).map_err(js_error)
}

/// Whether the receipt form must ask for reconciliation notes
#[wasm_bindgen]
pub fn receipt_needs_notes(order_lines_json: &str, receipts_json: &str) -> Result<bool, JsValue> {
    let reconciled: Vec<ReceiptLine> =
        serde_json::from_str(&reconcile_receipt(order_lines_json, receipts_json)?)
            .map_err(js_error)?;
    Ok(reconciliation::notes_required(&reconciled))
}

/// Validate a stock item form. Returns an error message, or nothing when valid.
#[wasm_bindgen]
pub fn validate_item_form(
    name: &str,
    category: &str,
    unit: &str,
    quantity: i64,
    min_quantity: i64,
    unit_price: f64,
) -> Option<String> {
    let Ok(price) = Decimal::try_from(unit_price) else {
        return Some("Invalid unit price".to_string());
    };
    let checks = [
        validate_item_name(name).map_err(str::to_string),
        category.parse::<ItemCategory>().map(|_| ()).map_err(|e| e.to_string()),
        unit.parse::<ItemUnit>().map(|_| ()).map_err(|e| e.to_string()),
        validate_stock_count(quantity).map_err(str::to_string),
        validate_stock_count(min_quantity).map_err(str::to_string),
        validate_unit_price(price).map_err(str::to_string),
    ];
    checks.into_iter().find_map(Result::err)
}

/// Validate a manual movement form. Returns an error message, or nothing when valid.
#[wasm_bindgen]
pub fn validate_movement_form(kind: &str, reason: &str, quantity: i64) -> Option<String> {
    if let Err(msg) = validate_movement_quantity(quantity) {
        return Some(msg.to_string());
    }
    let kind: MovementKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return Some(format!("{}", e)),
    };
    let reason: MovementReason = match reason.parse() {
        Ok(reason) => reason,
        Err(e) => return Some(format!("{}", e)),
    };
    (!reason.is_allowed_for(kind)).then(|| format!("{} is not a valid reason for {}", reason, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_receipt_line() {
        assert_eq!(classify_receipt_line(100, 100), "ok");
        assert_eq!(classify_receipt_line(50, 48), "partial");
        assert_eq!(classify_receipt_line(10, 12), "excess");
        assert_eq!(classify_receipt_line(5, 0), "partial");
    }

    #[test]
    fn test_receipt_needs_notes() {
        let item = "6f1c2f3e-8a0d-4f5b-9c1e-2a3b4c5d6e7f";
        let lines = format!(r#"[{{"item_id":"{item}","ordered_qty":50,"unit":"box"}}]"#);
        let exact = format!(r#"[{{"item_id":"{item}","received_qty":50}}]"#);
        let short = format!(r#"[{{"item_id":"{item}","received_qty":48}}]"#);

        assert_eq!(receipt_needs_notes(&lines, &exact).ok(), Some(false));
        assert_eq!(receipt_needs_notes(&lines, &short).ok(), Some(true));
    }

    #[test]
    fn test_validate_item_form() {
        assert_eq!(validate_item_form("Gauze", "material", "package", 10, 5, 3.5), None);
        assert!(validate_item_form("", "material", "package", 10, 5, 3.5).is_some());
        assert!(validate_item_form("Gauze", "food", "package", 10, 5, 3.5).is_some());
        assert!(validate_item_form("Gauze", "material", "package", -1, 5, 3.5).is_some());
        assert!(validate_item_form("Gauze", "material", "package", 10, 5, -1.0).is_some());
    }

    #[test]
    fn test_non_finite_price_is_invalid_not_negative() {
        for price in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(
                validate_item_form("Gauze", "material", "package", 10, 5, price).as_deref(),
                Some("Invalid unit price")
            );
        }
    }

    #[test]
    fn test_validate_movement_form() {
        assert_eq!(validate_movement_form("exit", "procedure_use", 3), None);
        assert_eq!(validate_movement_form("entry", "donation", 3), None);
        assert!(validate_movement_form("entry", "procedure_use", 3).is_some());
        assert!(validate_movement_form("exit", "purchase", 3).is_some());
        assert!(validate_movement_form("exit", "loss", 0).is_some());
        assert!(validate_movement_form("transfer", "loss", 1).is_some());
    }
}
