//! Point-of-sale models and cart pricing

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::net_owed_to_center;
use crate::validation::max_amount;

/// How a sale is settled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    Retail,
    /// Branch sale; the center's share is remitted later
    Consignment,
    /// Outright wholesale, billed later
    Outright,
}

impl SaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleType::Retail => "RETAIL",
            SaleType::Consignment => "CONSIGNMENT",
            SaleType::Outright => "OUTRIGHT",
        }
    }

    /// Billing-deferred sales record no payment at checkout
    pub fn is_billing_deferred(&self) -> bool {
        matches!(self, SaleType::Consignment | SaleType::Outright)
    }
}

impl std::str::FromStr for SaleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RETAIL" => Ok(SaleType::Retail),
            "CONSIGNMENT" => Ok(SaleType::Consignment),
            "OUTRIGHT" => Ok(SaleType::Outright),
            other => Err(format!("unknown sale type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl PaymentStatus {
    /// Paid once the remaining receivable is within `epsilon`
    pub fn from_remaining(remaining: Decimal, epsilon: Decimal) -> Self {
        if remaining <= epsilon {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Unpaid => "UNPAID",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAID" => Ok(PaymentStatus::Paid),
            "UNPAID" => Ok(PaymentStatus::Unpaid),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// A line in the checkout cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub qty: i64,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
}

impl CartLine {
    /// unit price x (1 - line discount) x qty, `None` on overflow
    pub fn line_total(&self) -> Option<Decimal> {
        let factor = Decimal::ONE - self.discount_percent.checked_div(Decimal::ONE_HUNDRED)?;
        self.unit_price
            .checked_mul(factor)?
            .checked_mul(Decimal::from(self.qty))
    }
}

/// A cart line as stored on the sale, with the center's unit share
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleLine {
    #[serde(flatten)]
    pub line: CartLine,
    pub consignment_unit_price: Decimal,
}

/// Cart totals before any settlement logic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartPricing {
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub total: Decimal,
}

/// Price a cart: line discounts first, then the global discount, clamped at zero.
/// Totals that do not fit a stored amount are rejected.
pub fn price_cart(
    lines: &[CartLine],
    global_discount_percent: Decimal,
) -> Result<CartPricing, &'static str> {
    const TOO_LARGE: &str = "Cart total exceeds the largest storable amount";

    let subtotal = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
        .filter(|subtotal| *subtotal <= max_amount())
        .ok_or(TOO_LARGE)?;
    let total_discount = global_discount_percent
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|rate| subtotal.checked_mul(rate))
        .ok_or(TOO_LARGE)?;
    let total = (subtotal - total_discount).max(Decimal::ZERO);
    Ok(CartPricing {
        subtotal,
        total_discount,
        total,
    })
}

/// Branch sales are always booked as consignment
pub fn effective_sale_type(requested: SaleType, is_central_location: bool) -> SaleType {
    if is_central_location {
        requested
    } else {
        SaleType::Consignment
    }
}

/// Amount collected at checkout.
///
/// An explicit down payment wins; otherwise billing-deferred sales collect
/// nothing and everything else is paid in full.
pub fn paid_at_checkout(down_payment: Option<Decimal>, sale_type: SaleType, total: Decimal) -> Decimal {
    match down_payment {
        Some(amount) => amount.max(Decimal::ZERO),
        None if sale_type.is_billing_deferred() => Decimal::ZERO,
        None => total,
    }
}

/// Everything checkout needs to book a sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutQuote {
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub total_price: Decimal,
    pub total_consignment: Decimal,
    pub sale_type: SaleType,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: PaymentStatus,
}

/// Inputs for [`quote_checkout`]
#[derive(Debug, Clone)]
pub struct QuoteRequest<'a> {
    pub lines: &'a [CartLine],
    pub global_discount_percent: Decimal,
    pub requested_type: SaleType,
    pub down_payment: Option<Decimal>,
    pub location_margin: Decimal,
    pub is_central_location: bool,
    pub paid_epsilon: Decimal,
}

pub fn quote_checkout(request: &QuoteRequest<'_>) -> Result<CheckoutQuote, &'static str> {
    let pricing = price_cart(request.lines, request.global_discount_percent)?;
    let sale_type = effective_sale_type(request.requested_type, request.is_central_location);
    let total_consignment = net_owed_to_center(
        pricing.total,
        request.location_margin,
        request.is_central_location,
    );
    let paid_amount = paid_at_checkout(request.down_payment, sale_type, pricing.total);
    let remaining_amount = (pricing.total - paid_amount).max(Decimal::ZERO);

    Ok(CheckoutQuote {
        subtotal: pricing.subtotal,
        total_discount: pricing.total_discount,
        total_price: pricing.total,
        total_consignment,
        sale_type,
        paid_amount,
        remaining_amount,
        status: PaymentStatus::from_remaining(remaining_amount, request.paid_epsilon),
    })
}

/// One checkout transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub date: NaiveDate,
    pub location_id: Uuid,
    pub customer_name: String,
    pub sales_source: String,
    /// Net of line and global discounts
    pub total_price: Decimal,
    /// Share owed to the center
    pub total_consignment: Decimal,
    pub total_discount: Decimal,
    pub discount_note: Option<String>,
    pub payment_method: String,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: PaymentStatus,
    pub sale_type: SaleType,
    pub items: Vec<SaleLine>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Apply a customer payment against the remaining receivable
    pub fn apply_payment(
        &mut self,
        amount: Decimal,
        method: &str,
        epsilon: Decimal,
    ) -> Result<(), &'static str> {
        if amount <= Decimal::ZERO {
            return Err("Payment amount must be positive");
        }
        if amount > self.remaining_amount {
            return Err("Payment exceeds the remaining receivable");
        }

        self.paid_amount += amount;
        self.remaining_amount -= amount;
        self.status = PaymentStatus::from_remaining(self.remaining_amount, epsilon);
        if !method.trim().is_empty() {
            self.payment_method = format!("{}, {}", self.payment_method, method.trim());
        }
        Ok(())
    }

    /// Mark a consignment invoice as paid off and reclassify it as retail
    pub fn settle_in_full(&mut self) {
        self.paid_amount = self.total_price;
        self.remaining_amount = Decimal::ZERO;
        self.status = PaymentStatus::Paid;
        self.sale_type = SaleType::Retail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: Decimal, qty: i64, discount: Decimal) -> CartLine {
        CartLine {
            product_id: Uuid::nil(),
            product_name: "Kemeja Linen".to_string(),
            color: "Cream".to_string(),
            size: "M".to_string(),
            qty,
            unit_price: price,
            discount_percent: discount,
        }
    }

    fn request(lines: &[CartLine]) -> QuoteRequest<'_> {
        QuoteRequest {
            lines,
            global_discount_percent: Decimal::ZERO,
            requested_type: SaleType::Retail,
            down_payment: None,
            location_margin: dec!(30),
            is_central_location: false,
            paid_epsilon: dec!(1),
        }
    }

    #[test]
    fn test_price_cart_applies_line_then_global_discount() {
        let lines = vec![line(dec!(100000), 2, dec!(10)), line(dec!(50000), 1, dec!(0))];
        let pricing = price_cart(&lines, dec!(5)).unwrap();

        assert_eq!(pricing.subtotal, dec!(230000));
        assert_eq!(pricing.total_discount, dec!(11500));
        assert_eq!(pricing.total, dec!(218500));
    }

    #[test]
    fn test_price_cart_clamps_at_zero() {
        let lines = vec![line(dec!(100000), 1, dec!(0))];
        let pricing = price_cart(&lines, dec!(150)).unwrap();
        assert_eq!(pricing.total, Decimal::ZERO);
    }

    #[test]
    fn test_price_cart_rejects_overflowing_totals() {
        let lines = vec![line(Decimal::MAX, 2, dec!(0))];
        assert!(price_cart(&lines, Decimal::ZERO).is_err());

        // each line fits, the sum does not
        let lines = vec![line(dec!(60000000000000), 1, dec!(0)); 2];
        assert_eq!(
            price_cart(&lines, Decimal::ZERO),
            Err("Cart total exceeds the largest storable amount")
        );
    }

    #[test]
    fn test_branch_sale_forced_to_consignment() {
        let lines = vec![line(dec!(150000), 1, dec!(0))];
        let quote = quote_checkout(&request(&lines)).unwrap();

        assert_eq!(quote.sale_type, SaleType::Consignment);
        assert_eq!(quote.total_price, dec!(150000));
        assert_eq!(quote.total_consignment, dec!(105000));
        assert_eq!(quote.paid_amount, Decimal::ZERO);
        assert_eq!(quote.remaining_amount, dec!(150000));
        assert_eq!(quote.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_central_retail_sale_paid_in_full() {
        let lines = vec![line(dec!(150000), 1, dec!(0))];
        let mut req = request(&lines);
        req.is_central_location = true;

        let quote = quote_checkout(&req).unwrap();

        assert_eq!(quote.sale_type, SaleType::Retail);
        assert_eq!(quote.total_consignment, dec!(150000));
        assert_eq!(quote.paid_amount, dec!(150000));
        assert_eq!(quote.status, PaymentStatus::Paid);
    }

    #[test]
    fn test_outright_sale_at_center_is_billed_later() {
        let lines = vec![line(dec!(80000), 3, dec!(0))];
        let mut req = request(&lines);
        req.is_central_location = true;
        req.requested_type = SaleType::Outright;

        let quote = quote_checkout(&req).unwrap();

        assert_eq!(quote.sale_type, SaleType::Outright);
        assert_eq!(quote.paid_amount, Decimal::ZERO);
        assert_eq!(quote.remaining_amount, dec!(240000));
    }

    #[test]
    fn test_down_payment_leaves_receivable() {
        let lines = vec![line(dec!(200000), 1, dec!(0))];
        let mut req = request(&lines);
        req.is_central_location = true;
        req.down_payment = Some(dec!(50000));

        let quote = quote_checkout(&req).unwrap();

        assert_eq!(quote.paid_amount, dec!(50000));
        assert_eq!(quote.remaining_amount, dec!(150000));
        assert_eq!(quote.status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_remaining_within_epsilon_is_paid() {
        assert_eq!(PaymentStatus::from_remaining(dec!(1), dec!(1)), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_remaining(dec!(0.5), dec!(1)), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_remaining(dec!(1.01), dec!(1)), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_sale_type_string_roundtrip() {
        for t in [SaleType::Retail, SaleType::Consignment, SaleType::Outright] {
            assert_eq!(t.as_str().parse::<SaleType>(), Ok(t));
        }
    }
}
