//! Validation utilities for production, sales and stock movements

use rust_decimal::Decimal;

use crate::models::{CartLine, SizeTarget};

// ============================================================================
// General Validations
// ============================================================================

/// Largest piece count accepted for one size or line
pub const MAX_QTY: i64 = 1_000_000_000;

/// Largest amount a NUMERIC(16, 2) column holds
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999_999_999, 2)
}

/// Size labels are compared upper-cased and trimmed ("m " == "M")
pub fn normalize_size(size: &str) -> String {
    size.trim().to_uppercase()
}

/// Validate a percentage in 0..=100
pub fn validate_percent(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

pub fn validate_positive_qty(qty: i64) -> Result<(), &'static str> {
    if qty <= 0 {
        return Err("Quantity must be greater than zero");
    }
    if qty > MAX_QTY {
        return Err("Quantity exceeds the allowed maximum");
    }
    Ok(())
}

pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    if amount > max_amount() {
        return Err("Amount exceeds the largest storable value");
    }
    Ok(())
}

pub fn validate_non_negative_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    if amount > max_amount() {
        return Err("Amount exceeds the largest storable value");
    }
    Ok(())
}

/// Sum piece counts, `None` when the total does not fit
pub fn sum_qty(values: impl IntoIterator<Item = i64>) -> Option<i64> {
    values.into_iter().try_fold(0i64, i64::checked_add)
}

// ============================================================================
// Production Validations
// ============================================================================

/// At least one size, no duplicate labels, every planned quantity positive
pub fn validate_size_targets(targets: &[SizeTarget]) -> Result<(), &'static str> {
    if targets.is_empty() {
        return Err("At least one size target is required");
    }
    for (i, target) in targets.iter().enumerate() {
        if target.size.trim().is_empty() {
            return Err("Size label cannot be empty");
        }
        if target.target_qty <= 0 {
            return Err("Planned quantity must be greater than zero");
        }
        if target.target_qty > MAX_QTY {
            return Err("Planned quantity exceeds the allowed maximum");
        }
        let label = normalize_size(&target.size);
        if targets[..i].iter().any(|t| normalize_size(&t.size) == label) {
            return Err("Duplicate size label");
        }
    }
    Ok(())
}

// ============================================================================
// Sales Validations
// ============================================================================

pub fn validate_cart_line(line: &CartLine) -> Result<(), &'static str> {
    if line.size.trim().is_empty() {
        return Err("Size is required");
    }
    validate_positive_qty(line.qty)?;
    validate_non_negative_amount(line.unit_price)?;
    validate_percent(line.discount_percent)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn target(size: &str, qty: i64) -> SizeTarget {
        SizeTarget {
            size: size.to_string(),
            target_qty: qty,
            result_qty: 0,
        }
    }

    #[test]
    fn test_normalize_size() {
        assert_eq!(normalize_size(" xl "), "XL");
    }

    #[test]
    fn test_validate_percent_bounds() {
        assert!(validate_percent(dec!(0)).is_ok());
        assert!(validate_percent(dec!(100)).is_ok());
        assert!(validate_percent(dec!(-0.1)).is_err());
        assert!(validate_percent(dec!(100.5)).is_err());
    }

    #[test]
    fn test_size_targets_reject_duplicates() {
        assert!(validate_size_targets(&[target("S", 10), target("M", 20)]).is_ok());
        assert!(validate_size_targets(&[target("M", 10), target("m", 5)]).is_err());
        assert!(validate_size_targets(&[]).is_err());
        assert!(validate_size_targets(&[target("L", 0)]).is_err());
    }

    #[test]
    fn test_cart_line_validation() {
        let mut line = CartLine {
            product_id: Uuid::nil(),
            product_name: "Tunik".to_string(),
            color: "Sage".to_string(),
            size: "L".to_string(),
            qty: 1,
            unit_price: dec!(120000),
            discount_percent: dec!(10),
        };
        assert!(validate_cart_line(&line).is_ok());

        line.qty = 0;
        assert!(validate_cart_line(&line).is_err());

        line.qty = 1;
        line.discount_percent = dec!(120);
        assert!(validate_cart_line(&line).is_err());
    }

    #[test]
    fn test_cart_line_rejects_unstorable_price_and_qty() {
        let mut line = CartLine {
            product_id: Uuid::nil(),
            product_name: "Tunik".to_string(),
            color: "Sage".to_string(),
            size: "L".to_string(),
            qty: 2,
            unit_price: Decimal::MAX,
            discount_percent: dec!(0),
        };
        assert_eq!(
            validate_cart_line(&line),
            Err("Amount exceeds the largest storable value")
        );

        line.unit_price = max_amount();
        assert!(validate_cart_line(&line).is_ok());

        line.qty = i64::MAX;
        assert_eq!(validate_cart_line(&line), Err("Quantity exceeds the allowed maximum"));
    }

    #[test]
    fn test_sum_qty_detects_overflow() {
        assert_eq!(sum_qty([3, 4]), Some(7));
        assert_eq!(sum_qty([i64::MAX, 1]), None);
        assert!(validate_size_targets(&[target("M", i64::MAX)]).is_err());
    }
}
