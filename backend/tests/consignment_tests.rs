//! Consignment accounting tests
//!
//! Covers invoice payoff, outstanding obligations, manual settlements and
//! the consolidated revenue view.

mod common;

use apparel_ops_backend::error::AppError;
use apparel_ops_backend::services::consignment::{SettleInvoiceInput, SettlementInput};
use apparel_ops_backend::services::sales::CheckoutInput;
use apparel_ops_backend::services::{ConsignmentService, SalesProcessor};
use apparel_ops_backend::store::{FailPoint, SettlementFilter};
use common::*;
use rust_decimal::Decimal;
use shared::{CartLine, DateRange, PaymentStatus, Sale, SaleType, SettlementKind};
use uuid::Uuid;

async fn sell(f: &Fixture, location_id: Uuid, unit_price: &str) -> Sale {
    f.stock(location_id, "Hitam", "M", 1).await;
    SalesProcessor::new(f.store.clone(), &f.config)
        .checkout(
            CheckoutInput {
                location_id,
                customer_name: None,
                sales_source: None,
                items: vec![CartLine {
                    product_id: PRODUCT_ID,
                    product_name: "Gamis Polos".to_string(),
                    color: "Hitam".to_string(),
                    size: "M".to_string(),
                    qty: 1,
                    unit_price: dec(unit_price),
                    discount_percent: Decimal::ZERO,
                }],
                global_discount_percent: Decimal::ZERO,
                discount_note: None,
                sale_type: None,
                payment_method: None,
                down_payment: None,
                operator_name: None,
                date: Some(date(2024, 5, 10)),
            },
            None,
        )
        .await
        .unwrap()
}

fn deposit(location_id: Uuid, amount: &str) -> SettlementInput {
    SettlementInput {
        location_id,
        date: Some(date(2024, 5, 20)),
        amount: dec(amount),
        payment_method: Some("Transfer BCA".to_string()),
        note: None,
    }
}

// ============================================================================
// Invoice Payoff
// ============================================================================

#[cfg(test)]
mod payoff_tests {
    use super::*;

    #[tokio::test]
    async fn test_settle_invoice_records_center_share() {
        let f = Fixture::new().await;
        let sale = sell(&f, BRANCH_ID, "200000").await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);

        let settled = consignment
            .settle_invoice(sale.id, SettleInvoiceInput::default(), None)
            .await
            .unwrap();

        assert_eq!(settled.settlement.amount, dec("140000"));
        assert_eq!(settled.settlement.kind, SettlementKind::InvoicePayoff);
        assert_eq!(settled.settlement.sale_id, Some(sale.id));
        assert_eq!(settled.settlement.location_id, BRANCH_ID);
        assert_eq!(settled.sale.sale_type, SaleType::Retail);
        assert_eq!(settled.sale.status, PaymentStatus::Paid);
        assert_eq!(settled.sale.remaining_amount, Decimal::ZERO);
        assert_eq!(settled.sale.paid_amount, dec("200000"));
    }

    #[tokio::test]
    async fn test_settled_invoice_cannot_be_settled_again() {
        let f = Fixture::new().await;
        let sale = sell(&f, BRANCH_ID, "200000").await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);
        consignment
            .settle_invoice(sale.id, SettleInvoiceInput::default(), None)
            .await
            .unwrap();

        let err = consignment
            .settle_invoice(sale.id, SettleInvoiceInput::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidStateTransition(_)));
        let report = consignment.list_settlements(SettlementFilter::default()).await.unwrap();
        assert_eq!(report.settlements.len(), 1);
    }

    #[tokio::test]
    async fn test_retail_sale_has_no_invoice() {
        let f = Fixture::new().await;
        let sale = sell(&f, CENTRAL_ID, "200000").await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);

        let err = consignment
            .settle_invoice(sale.id, SettleInvoiceInput::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn test_failed_sale_update_discards_settlement() {
        let f = Fixture::new().await;
        let sale = sell(&f, BRANCH_ID, "200000").await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);
        f.memory.fail_on(FailPoint::UpdateSale).await;

        assert!(consignment
            .settle_invoice(sale.id, SettleInvoiceInput::default(), None)
            .await
            .is_err());
        f.memory.clear_failures().await;

        let report = consignment.list_settlements(SettlementFilter::default()).await.unwrap();
        assert!(report.settlements.is_empty());
        let outstanding = consignment.outstanding(Some(BRANCH_ID)).await.unwrap();
        assert_eq!(outstanding.outstanding, dec("140000"));
    }
}

// ============================================================================
// Outstanding and Settlements
// ============================================================================

#[cfg(test)]
mod settlement_tests {
    use super::*;

    #[tokio::test]
    async fn test_outstanding_sums_open_consignment_invoices() {
        let f = Fixture::new().await;
        let first = sell(&f, BRANCH_ID, "200000").await;
        sell(&f, BRANCH_ID, "100000").await;
        sell(&f, OTHER_BRANCH_ID, "50000").await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);

        let branch = consignment.outstanding(Some(BRANCH_ID)).await.unwrap();
        assert_eq!(branch.invoice_count, 2);
        assert_eq!(branch.outstanding, dec("210000"));

        let all = consignment.outstanding(None).await.unwrap();
        assert_eq!(all.outstanding, dec("245000"));

        consignment
            .settle_invoice(first.id, SettleInvoiceInput::default(), None)
            .await
            .unwrap();
        let branch = consignment.outstanding(Some(BRANCH_ID)).await.unwrap();
        assert_eq!(branch.invoice_count, 1);
        assert_eq!(branch.outstanding, dec("70000"));
    }

    #[tokio::test]
    async fn test_manual_settlements_are_summarized_per_location() {
        let f = Fixture::new().await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);

        consignment.record_settlement(deposit(BRANCH_ID, "50000"), None).await.unwrap();
        consignment.record_settlement(deposit(BRANCH_ID, "25000"), None).await.unwrap();
        consignment.record_settlement(deposit(OTHER_BRANCH_ID, "10000"), None).await.unwrap();

        let report = consignment.list_settlements(SettlementFilter::default()).await.unwrap();
        assert_eq!(report.summary.total_amount, dec("85000"));
        let branch = report
            .summary
            .by_location
            .iter()
            .find(|t| t.location_id == BRANCH_ID)
            .unwrap();
        assert_eq!(branch.count, 2);
        assert_eq!(branch.total_amount, dec("75000"));

        let scoped = consignment
            .list_settlements(SettlementFilter {
                location_id: Some(OTHER_BRANCH_ID),
                ..SettlementFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(scoped.settlements.len(), 1);
        assert_eq!(scoped.settlements[0].kind, SettlementKind::Manual);
    }

    #[tokio::test]
    async fn test_settlement_requires_positive_amount_and_known_location() {
        let f = Fixture::new().await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);

        let err = consignment.record_settlement(deposit(BRANCH_ID, "0"), None).await.unwrap_err();
        assert!(err.is_validation());

        let err = consignment
            .record_settlement(deposit(Uuid::from_u128(404), "1000"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_replayed_settlement_is_recorded_once() {
        let f = Fixture::new().await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);

        consignment
            .record_settlement(deposit(BRANCH_ID, "50000"), Some("dep-7"))
            .await
            .unwrap();
        let err = consignment
            .record_settlement(deposit(BRANCH_ID, "50000"), Some("dep-7"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DuplicateOperation(_)));
        let report = consignment.list_settlements(SettlementFilter::default()).await.unwrap();
        assert_eq!(report.summary.total_amount, dec("50000"));
    }
}

// ============================================================================
// Revenue
// ============================================================================

#[cfg(test)]
mod revenue_tests {
    use super::*;

    #[tokio::test]
    async fn test_revenue_combines_direct_sales_and_branch_share() {
        let f = Fixture::new().await;
        sell(&f, CENTRAL_ID, "100000").await;
        sell(&f, BRANCH_ID, "200000").await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);

        let range = DateRange::new(date(2024, 5, 1), date(2024, 5, 31)).unwrap();
        let revenue = consignment.revenue(range).await.unwrap();

        assert_eq!(revenue.direct_net, dec("100000"));
        assert_eq!(revenue.consignment_share, dec("140000"));
        assert_eq!(revenue.consolidated_total, dec("240000"));
    }

    #[tokio::test]
    async fn test_revenue_excludes_sales_outside_range() {
        let f = Fixture::new().await;
        sell(&f, CENTRAL_ID, "100000").await;
        let consignment = ConsignmentService::new(f.store.clone(), &f.config);

        let range = DateRange::new(date(2024, 6, 1), date(2024, 6, 30)).unwrap();
        let revenue = consignment.revenue(range).await.unwrap();

        assert_eq!(revenue.consolidated_total, Decimal::ZERO);
    }
}
