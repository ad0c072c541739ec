//! Consignment settlement accounting between branches and the center

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{
    aggregate_outstanding, summarize_revenue, summarize_settlements, validate_positive_amount,
    DateRange, RevenueSummary, Sale, SaleType, Settlement, SettlementKind, SettlementSummary,
};

use super::begin_operation;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::{SaleFilter, SettlementFilter, Store};

/// Consignment accounting service
#[derive(Clone)]
pub struct ConsignmentService {
    store: Arc<dyn Store>,
    central_location_id: Uuid,
}

/// Options for paying off a consignment invoice
#[derive(Debug, Default, Deserialize)]
pub struct SettleInvoiceInput {
    pub payment_method: Option<String>,
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// A manual deposit from a branch
#[derive(Debug, Deserialize)]
pub struct SettlementInput {
    pub location_id: Uuid,
    pub date: Option<NaiveDate>,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub note: Option<String>,
}

/// Result of paying off an invoice
#[derive(Debug, Clone, Serialize)]
pub struct SettledInvoice {
    pub settlement: Settlement,
    pub sale: Sale,
}

/// Unremitted consignment obligation
#[derive(Debug, Clone, Serialize)]
pub struct OutstandingSummary {
    pub location_id: Option<Uuid>,
    pub invoice_count: usize,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementReport {
    pub settlements: Vec<Settlement>,
    pub summary: SettlementSummary,
}

impl ConsignmentService {
    /// Create a new ConsignmentService instance
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            central_location_id: config.accounting.central_location_id,
        }
    }

    /// Pay off a consignment invoice: record a settlement for the center's
    /// share and mark the sale as fully paid retail, in one unit of work.
    pub async fn settle_invoice(
        &self,
        sale_id: Uuid,
        input: SettleInvoiceInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<SettledInvoice> {
        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "invoice_settle").await?;
        let mut sale = tx
            .lock_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        if sale.sale_type != SaleType::Consignment {
            return Err(AppError::InvalidStateTransition(format!(
                "Sale {} is {} and has no consignment invoice to settle",
                sale.id,
                sale.sale_type.as_str()
            )));
        }
        if sale.total_consignment <= Decimal::ZERO {
            return Err(AppError::validation(
                "total_consignment",
                "Consignment amount is zero; check the location margin",
            ));
        }

        let settlement = Settlement {
            id: Uuid::new_v4(),
            location_id: sale.location_id,
            date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
            amount: sale.total_consignment,
            payment_method: input
                .payment_method
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Transfer".to_string()),
            note: input
                .note
                .or_else(|| Some(format!("Invoice payoff for sale {}", sale.id))),
            kind: SettlementKind::InvoicePayoff,
            sale_id: Some(sale.id),
            created_at: Utc::now(),
        };
        tx.insert_settlement(&settlement).await?;

        sale.settle_in_full();
        tx.update_sale(&sale).await?;
        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            location_id = %sale.location_id,
            amount = %settlement.amount,
            "Consignment invoice settled"
        );
        Ok(SettledInvoice { settlement, sale })
    }

    /// Record a deposit entered by branch reconciliation
    pub async fn record_settlement(
        &self,
        input: SettlementInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<Settlement> {
        validate_positive_amount(input.amount).map_err(|msg| AppError::validation("amount", msg))?;

        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "settlement").await?;
        if tx.get_location(input.location_id).await?.is_none() {
            return Err(AppError::NotFound("Location".to_string()));
        }

        let settlement = Settlement {
            id: Uuid::new_v4(),
            location_id: input.location_id,
            date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
            amount: input.amount,
            payment_method: input
                .payment_method
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Transfer".to_string()),
            note: input.note,
            kind: SettlementKind::Manual,
            sale_id: None,
            created_at: Utc::now(),
        };
        tx.insert_settlement(&settlement).await?;
        tx.commit().await?;

        tracing::info!(
            settlement_id = %settlement.id,
            location_id = %settlement.location_id,
            amount = %settlement.amount,
            "Settlement recorded"
        );
        Ok(settlement)
    }

    /// Consignment-adjusted total of every unsettled consignment sale
    pub async fn outstanding(&self, location_id: Option<Uuid>) -> AppResult<OutstandingSummary> {
        let sales = self
            .store
            .list_sales(&SaleFilter {
                location_id,
                ..SaleFilter::default()
            })
            .await?;

        let is_open = |s: &Sale| s.sale_type == SaleType::Consignment;
        Ok(OutstandingSummary {
            location_id,
            invoice_count: sales.iter().filter(|s| is_open(*s)).count(),
            outstanding: aggregate_outstanding(&sales, is_open),
        })
    }

    pub async fn list_settlements(&self, filter: SettlementFilter) -> AppResult<SettlementReport> {
        let settlements = self.store.list_settlements(&filter).await?;
        let summary = summarize_settlements(&settlements);
        Ok(SettlementReport {
            settlements,
            summary,
        })
    }

    /// Central revenue: direct sales plus the center's share of branch sales
    pub async fn revenue(&self, range: DateRange) -> AppResult<RevenueSummary> {
        let sales = self
            .store
            .list_sales(&SaleFilter {
                from: Some(range.start),
                to: Some(range.end),
                ..SaleFilter::default()
            })
            .await?;
        Ok(summarize_revenue(&sales, self.central_location_id))
    }
}
