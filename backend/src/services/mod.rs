//! Business logic services for apparel production, stock and sales

pub mod consignment;
pub mod ledger;
pub mod sales;
pub mod transfer;
pub mod workflow;

pub use consignment::ConsignmentService;
pub use ledger::StockLedger;
pub use sales::SalesProcessor;
pub use transfer::TransferOrchestrator;
pub use workflow::WorkflowEngine;

use std::collections::BTreeMap;

use shared::MAX_QTY;

use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

/// Open a unit of work, claiming the caller's idempotency key when given
pub(crate) async fn begin_operation(
    store: &dyn Store,
    idempotency_key: Option<&str>,
    operation: &str,
) -> AppResult<Box<dyn StoreTx>> {
    let mut tx = store.begin().await?;
    if let Some(key) = idempotency_key {
        tx.claim_operation(key, operation).await?;
    }
    Ok(tx)
}

/// Add to a per-key piece count, rejecting totals beyond the per-line maximum
pub(crate) fn add_qty<K: Ord>(
    counts: &mut BTreeMap<K, i64>,
    key: K,
    qty: i64,
    field: &str,
) -> AppResult<()> {
    let count = counts.entry(key).or_default();
    *count = count
        .checked_add(qty)
        .filter(|total| *total <= MAX_QTY)
        .ok_or_else(|| AppError::validation(field, "Quantity exceeds the allowed maximum"))?;
    Ok(())
}
