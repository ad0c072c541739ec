//! Consignment accounting: what a branch owes the center

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Sale;

/// Share of a sale the center is owed.
///
/// The center keeps all of its own sales; a branch keeps its margin and
/// remits the remainder.
pub fn net_owed_to_center(gross_total: Decimal, location_margin: Decimal, is_central: bool) -> Decimal {
    if is_central {
        gross_total
    } else {
        gross_total * (Decimal::ONE - location_margin / Decimal::ONE_HUNDRED)
    }
}

/// What the branch keeps out of a sale
pub fn branch_profit_margin(gross_total: Decimal, net_owed: Decimal) -> Decimal {
    gross_total - net_owed
}

/// Sum the consignment-adjusted totals of every sale matching `predicate`
pub fn aggregate_outstanding<F>(sales: &[Sale], predicate: F) -> Decimal
where
    F: Fn(&Sale) -> bool,
{
    sales
        .iter()
        .filter(|s| predicate(s))
        .map(|s| s.total_consignment)
        .sum()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementKind {
    /// Deposit entered by branch reconciliation
    Manual,
    /// Generated when a consignment invoice is paid off
    InvoicePayoff,
}

impl SettlementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementKind::Manual => "MANUAL",
            SettlementKind::InvoicePayoff => "INVOICE_PAYOFF",
        }
    }
}

impl std::str::FromStr for SettlementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(SettlementKind::Manual),
            "INVOICE_PAYOFF" => Ok(SettlementKind::InvoicePayoff),
            other => Err(format!("unknown settlement kind: {}", other)),
        }
    }
}

/// A deposit from a branch to the center. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub location_id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub payment_method: String,
    pub note: Option<String>,
    pub kind: SettlementKind,
    /// Paid-off invoice, for automatic settlements
    pub sale_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Settlement totals for one location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationSettlementTotal {
    pub location_id: Uuid,
    pub count: usize,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementSummary {
    pub total_amount: Decimal,
    pub by_location: Vec<LocationSettlementTotal>,
}

pub fn summarize_settlements(settlements: &[Settlement]) -> SettlementSummary {
    let mut per_location: BTreeMap<Uuid, (usize, Decimal)> = BTreeMap::new();
    for s in settlements {
        let entry = per_location.entry(s.location_id).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += s.amount;
    }

    SettlementSummary {
        total_amount: settlements.iter().map(|s| s.amount).sum(),
        by_location: per_location
            .into_iter()
            .map(|(location_id, (count, total_amount))| LocationSettlementTotal {
                location_id,
                count,
                total_amount,
            })
            .collect(),
    }
}

/// Central revenue over a period
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RevenueSummary {
    pub direct_gross: Decimal,
    pub direct_discount: Decimal,
    pub direct_net: Decimal,
    pub consignment_share: Decimal,
    pub consolidated_total: Decimal,
}

/// Split sales into the center's direct revenue and its share of branch sales
pub fn summarize_revenue(sales: &[Sale], central_location_id: Uuid) -> RevenueSummary {
    let mut summary = RevenueSummary::default();
    for sale in sales {
        if sale.location_id == central_location_id {
            summary.direct_net += sale.total_price;
            summary.direct_discount += sale.total_discount;
        } else {
            summary.consignment_share += sale.total_consignment;
        }
    }
    summary.direct_gross = summary.direct_net + summary.direct_discount;
    summary.consolidated_total = summary.direct_net + summary.consignment_share;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentStatus, SaleType};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn sale(location_id: Uuid, total: Decimal, consignment: Decimal, discount: Decimal, sale_type: SaleType) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            location_id,
            customer_name: "Walk-in".to_string(),
            sales_source: "Customer".to_string(),
            total_price: total,
            total_consignment: consignment,
            total_discount: discount,
            discount_note: None,
            payment_method: "Cash".to_string(),
            paid_amount: Decimal::ZERO,
            remaining_amount: total,
            status: PaymentStatus::Unpaid,
            sale_type,
            items: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_branch_owes_complement_of_margin() {
        assert_eq!(net_owed_to_center(dec!(150000), dec!(30), false), dec!(105000));
        assert_eq!(branch_profit_margin(dec!(150000), dec!(105000)), dec!(45000));
    }

    #[test]
    fn test_aggregate_outstanding_filters_consignment() {
        let branch = Uuid::new_v4();
        let sales = vec![
            sale(branch, dec!(200000), dec!(140000), dec!(0), SaleType::Consignment),
            sale(branch, dec!(100000), dec!(70000), dec!(0), SaleType::Consignment),
            sale(branch, dec!(50000), dec!(35000), dec!(0), SaleType::Retail),
        ];

        let outstanding = aggregate_outstanding(&sales, |s| s.sale_type == SaleType::Consignment);
        assert_eq!(outstanding, dec!(210000));
    }

    #[test]
    fn test_zero_share_sale_adds_nothing_outstanding() {
        let branch = Uuid::new_v4();
        let sales = vec![
            sale(branch, dec!(120000), dec!(0), dec!(0), SaleType::Consignment),
            sale(branch, dec!(100000), dec!(70000), dec!(0), SaleType::Consignment),
        ];

        let outstanding = aggregate_outstanding(&sales, |s| s.sale_type == SaleType::Consignment);
        assert_eq!(outstanding, dec!(70000));
    }

    #[test]
    fn test_revenue_summary_splits_direct_and_branch() {
        let central = Uuid::from_u128(1);
        let branch = Uuid::new_v4();
        let sales = vec![
            sale(central, dec!(90000), dec!(90000), dec!(10000), SaleType::Retail),
            sale(branch, dec!(150000), dec!(105000), dec!(0), SaleType::Consignment),
        ];

        let summary = summarize_revenue(&sales, central);

        assert_eq!(summary.direct_net, dec!(90000));
        assert_eq!(summary.direct_gross, dec!(100000));
        assert_eq!(summary.consignment_share, dec!(105000));
        assert_eq!(summary.consolidated_total, dec!(195000));
    }

    #[test]
    fn test_summarize_settlements_per_location() {
        let a = Uuid::from_u128(10);
        let b = Uuid::from_u128(20);
        let mk = |location_id, amount| Settlement {
            id: Uuid::new_v4(),
            location_id,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            amount,
            payment_method: "Transfer".to_string(),
            note: None,
            kind: SettlementKind::Manual,
            sale_id: None,
            created_at: Utc::now(),
        };

        let summary = summarize_settlements(&[mk(a, dec!(100)), mk(b, dec!(50)), mk(a, dec!(25))]);

        assert_eq!(summary.total_amount, dec!(175));
        assert_eq!(summary.by_location.len(), 2);
        assert_eq!(summary.by_location[0].location_id, a);
        assert_eq!(summary.by_location[0].count, 2);
        assert_eq!(summary.by_location[0].total_amount, dec!(125));
    }

    proptest! {
        #[test]
        fn test_central_location_keeps_everything(gross in 0i64..1_000_000_000, margin in 0u32..=100) {
            let x = Decimal::from(gross);
            prop_assert_eq!(net_owed_to_center(x, Decimal::from(margin), true), x);
        }

        #[test]
        fn test_net_owed_plus_margin_is_conserved(gross in 0i64..1_000_000_000, margin in 0u32..=100) {
            let x = Decimal::from(gross);
            let owed = net_owed_to_center(x, Decimal::from(margin), false);
            prop_assert_eq!(owed + branch_profit_margin(x, owed), x);
        }
    }
}
