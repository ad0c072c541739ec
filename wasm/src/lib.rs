//! WebAssembly module for the apparel point of sale
//!
//! Provides client-side computation for:
//! - Cart quotes (discounts, consignment share, payment status)
//! - Production stage progress
//! - Size label normalization

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Cart quote request as sent by the POS screen
#[derive(Debug, Deserialize)]
struct CartQuoteRequest {
    lines: Vec<CartLine>,
    #[serde(default)]
    global_discount_percent: Decimal,
    #[serde(default)]
    sale_type: Option<SaleType>,
    #[serde(default)]
    down_payment: Option<Decimal>,
    #[serde(default)]
    location_margin: Decimal,
    #[serde(default)]
    is_central_location: bool,
    #[serde(default = "default_paid_epsilon")]
    paid_epsilon: Decimal,
}

fn default_paid_epsilon() -> Decimal {
    Decimal::ONE
}

/// Quote a cart before checkout. Takes and returns JSON.
#[wasm_bindgen]
pub fn quote_cart(request_json: &str) -> Result<String, JsValue> {
    let request: CartQuoteRequest = serde_json::from_str(request_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid cart JSON: {}", e)))?;

    for line in &request.lines {
        validate_cart_line(line).map_err(JsValue::from_str)?;
    }
    validate_percent(request.global_discount_percent).map_err(JsValue::from_str)?;

    let quote = quote_checkout(&QuoteRequest {
        lines: &request.lines,
        global_discount_percent: request.global_discount_percent,
        requested_type: request.sale_type.unwrap_or(SaleType::Retail),
        down_payment: request.down_payment,
        location_margin: request.location_margin,
        is_central_location: request.is_central_location,
        paid_epsilon: request.paid_epsilon,
    })
    .map_err(JsValue::from_str)?;

    serde_json::to_string(&quote).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Amount a location owes the center for a sale total
#[wasm_bindgen]
pub fn consignment_share(gross_total: f64, location_margin: f64, is_central: bool) -> f64 {
    let gross = Decimal::from_f64(gross_total).unwrap_or(Decimal::ZERO);
    let margin = Decimal::from_f64(location_margin).unwrap_or(Decimal::ZERO);
    net_owed_to_center(gross, margin, is_central)
        .to_f64()
        .unwrap_or(0.0)
}

/// Progress percentage of a batch sitting at the given stage
#[wasm_bindgen]
pub fn stage_progress(stage: &str) -> Result<i32, JsValue> {
    let stage: WorkflowStage = stage.parse().map_err(|e: String| JsValue::from_str(&e))?;
    Ok(stage.progress())
}

/// Stage after the given one, if any
#[wasm_bindgen]
pub fn next_stage(stage: &str) -> Option<String> {
    stage
        .parse::<WorkflowStage>()
        .ok()
        .and_then(|s| s.next())
        .map(|s| s.as_str().to_string())
}

/// Canonical size label (" xl " -> "XL")
#[wasm_bindgen]
pub fn normalize_size_label(size: &str) -> String {
    normalize_size(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_cart_branch_consignment() {
        let json = r#"{
            "lines": [{
                "product_id": "00000000-0000-0000-0000-000000000064",
                "product_name": "Kemeja Linen",
                "color": "Sage",
                "size": "M",
                "qty": 1,
                "unit_price": "150000"
            }],
            "location_margin": "30"
        }"#;

        let quote: serde_json::Value = serde_json::from_str(&quote_cart(json).unwrap()).unwrap();
        assert_eq!(quote["sale_type"], "CONSIGNMENT");
        assert_eq!(quote["status"], "UNPAID");
        let share: Decimal = quote["total_consignment"].as_str().unwrap().parse().unwrap();
        assert_eq!(share, Decimal::from(105_000));
    }

    #[test]
    fn test_consignment_share() {
        assert!((consignment_share(200_000.0, 30.0, false) - 140_000.0).abs() < 0.001);
        assert!((consignment_share(200_000.0, 30.0, true) - 200_000.0).abs() < 0.001);
    }

    #[test]
    fn test_stage_progress() {
        assert_eq!(stage_progress("PATTERN").unwrap(), 0);
        assert_eq!(stage_progress("SEW").unwrap(), 33);
        assert_eq!(stage_progress("DONE").unwrap(), 100);
    }

    #[test]
    fn test_next_stage() {
        assert_eq!(next_stage("PACK").as_deref(), Some("DONE"));
        assert_eq!(next_stage("DONE"), None);
        assert_eq!(next_stage("IRONING"), None);
    }

    #[test]
    fn test_normalize_size_label() {
        assert_eq!(normalize_size_label(" xl "), "XL");
    }
}
