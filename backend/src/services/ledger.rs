//! Finished-goods stock ledger keyed by (product, location, color, size)

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{
    aggregate_by_color_size, normalize_size, total_pieces, ColorSizeStock, StockKey, StockUnit,
    MAX_QTY,
};

use super::begin_operation;
use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

/// Stock ledger service
#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn Store>,
}

/// Input for a manual stock correction
#[derive(Debug, Deserialize)]
pub struct AdjustStockInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub color: String,
    pub size: String,
    pub delta: i64,
}

/// Quantity of one bucket after an adjustment
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    #[serde(flatten)]
    pub key: StockKey,
    pub qty: i64,
}

/// Colour and size availability for a product
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub product_id: Uuid,
    pub location_id: Option<Uuid>,
    pub by_color: ColorSizeStock,
    pub total: i64,
}

impl StockLedger {
    /// Create a new StockLedger instance
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Apply a signed delta to one bucket as its own unit of work
    pub async fn adjust(
        &self,
        input: AdjustStockInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<StockLevel> {
        if input.delta == 0 {
            return Err(AppError::validation("delta", "Adjustment must not be zero"));
        }
        if input.delta.unsigned_abs() > MAX_QTY as u64 {
            return Err(AppError::validation("delta", "Adjustment exceeds the allowed maximum"));
        }
        let key = stock_key(input.product_id, input.location_id, &input.color, &input.size)?;

        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "stock_adjust").await?;
        if tx.get_location(key.location_id).await?.is_none() {
            return Err(AppError::NotFound("Location".to_string()));
        }
        let qty = apply_delta(tx.as_mut(), &key, input.delta).await?;
        tx.commit().await?;

        tracing::info!(%key, delta = input.delta, qty, "Stock adjusted");
        Ok(StockLevel { key, qty })
    }

    /// All buckets of a product, optionally scoped to one location
    pub async fn query(&self, product_id: Uuid, location_id: Option<Uuid>) -> AppResult<Vec<StockUnit>> {
        self.store.list_stock(product_id, location_id).await
    }

    /// Colour then size view of a product's stock
    pub async fn availability(&self, product_id: Uuid, location_id: Option<Uuid>) -> AppResult<Availability> {
        let units = self.query(product_id, location_id).await?;
        let by_color = aggregate_by_color_size(&units);
        let total = total_pieces(&by_color);
        Ok(Availability {
            product_id,
            location_id,
            by_color,
            total,
        })
    }
}

/// Build a ledger key with a trimmed colour and normalised size
pub(crate) fn stock_key(product_id: Uuid, location_id: Uuid, color: &str, size: &str) -> AppResult<StockKey> {
    let color = color.trim();
    if color.is_empty() {
        return Err(AppError::validation("color", "Color is required"));
    }
    let size = normalize_size(size);
    if size.is_empty() {
        return Err(AppError::validation("size", "Size is required"));
    }
    Ok(StockKey::new(product_id, location_id, color, &size))
}

/// Apply one ledger delta inside an open unit of work
pub(crate) async fn apply_delta(tx: &mut dyn StoreTx, key: &StockKey, delta: i64) -> AppResult<i64> {
    let qty = tx.adjust_stock(key, delta).await?;
    tracing::debug!(%key, delta, qty, "Ledger delta applied");
    if qty < 0 && delta < 0 {
        tracing::warn!(%key, qty, "Stock bucket is negative after debit");
    }
    Ok(qty)
}

/// Lock every bucket an operation writes, in key order, before any write.
/// Operations over overlapping buckets then queue instead of deadlocking.
pub(crate) async fn lock_buckets<'a>(
    tx: &mut dyn StoreTx,
    keys: impl IntoIterator<Item = &'a StockKey>,
) -> AppResult<()> {
    for key in lock_order(keys) {
        tx.lock_stock(key).await?;
    }
    Ok(())
}

fn lock_order<'a>(keys: impl IntoIterator<Item = &'a StockKey>) -> BTreeSet<&'a StockKey> {
    keys.into_iter().collect()
}

/// Check every requested debit against on-hand stock, locking the buckets.
/// Requests for the same bucket must already be summed.
pub(crate) async fn ensure_available(
    tx: &mut dyn StoreTx,
    requested: &BTreeMap<StockKey, i64>,
) -> AppResult<()> {
    for (key, qty) in requested {
        let available = tx.stock_qty(key).await?;
        if *qty > available {
            return Err(AppError::InsufficientStock {
                size: key.size.clone(),
                requested: *qty,
                available,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_key_normalises_size() {
        let key = stock_key(Uuid::nil(), Uuid::nil(), " Red ", " m").unwrap();
        assert_eq!(key.color, "Red");
        assert_eq!(key.size, "M");
    }

    #[test]
    fn test_stock_key_requires_color_and_size() {
        assert!(stock_key(Uuid::nil(), Uuid::nil(), "", "M").is_err());
        assert!(stock_key(Uuid::nil(), Uuid::nil(), "Red", "  ").is_err());
    }

    #[test]
    fn test_opposite_transfers_lock_in_same_order() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let product = Uuid::from_u128(100);
        let at = |location| StockKey::new(product, location, "Sage", "M");

        // A -> B touches the source first, B -> A touches B first
        let a_to_b = [at(a), at(b)];
        let b_to_a = [at(b), at(a)];

        let first: Vec<_> = lock_order(&a_to_b).into_iter().cloned().collect();
        let second: Vec<_> = lock_order(&b_to_a).into_iter().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(lock_order(&[at(a), at(a)]).len(), 1);
    }
}
