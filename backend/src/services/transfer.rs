//! Inter-location transfers and manual stock entries

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{
    generate_movement_code, group_into_invoices, normalize_size, sum_qty, MovementInvoice,
    MovementKind, SizeQty, StockKey, StockMovement,
};

use super::{add_qty, begin_operation};
use super::ledger::{apply_delta, ensure_available, lock_buckets};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

const DEFAULT_MOVEMENT_LIMIT: i64 = 500;

/// Transfer orchestrator
#[derive(Clone)]
pub struct TransferOrchestrator {
    store: Arc<dyn Store>,
    central_location_id: Uuid,
}

/// One product/colour with quantities per size
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StagedLine {
    pub product_id: Uuid,
    pub color: String,
    pub sizes: Vec<SizeQty>,
    #[serde(default)]
    pub total_qty: i64,
}

/// Request to stage a line against a source location's stock
#[derive(Debug, Deserialize)]
pub struct StageLineInput {
    pub source_location_id: Uuid,
    pub product_id: Uuid,
    pub color: String,
    pub sizes: Vec<SizeQty>,
}

#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub from_location_id: Uuid,
    pub to_location_id: Option<Uuid>,
    pub lines: Vec<StagedLine>,
    pub note: Option<String>,
    #[serde(default)]
    pub operator_name: String,
    pub date: Option<NaiveDate>,
}

/// Goods received with no source location
#[derive(Debug, Deserialize)]
pub struct StockEntryInput {
    /// Defaults to the central location
    pub to_location_id: Option<Uuid>,
    pub lines: Vec<StagedLine>,
    pub note: Option<String>,
    #[serde(default)]
    pub operator_name: String,
    pub date: Option<NaiveDate>,
}

impl TransferOrchestrator {
    /// Create a new TransferOrchestrator instance
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            central_location_id: config.accounting.central_location_id,
        }
    }

    /// Check a line against the source location's current stock.
    /// Nothing is persisted; the caller keeps accepted lines until commit.
    pub async fn stage_line(&self, input: StageLineInput) -> AppResult<StagedLine> {
        let line = normalize_line(StagedLine {
            product_id: input.product_id,
            color: input.color,
            sizes: input.sizes,
            total_qty: 0,
        })?;

        let on_hand = self
            .store
            .list_stock(line.product_id, Some(input.source_location_id))
            .await?;
        for entry in &line.sizes {
            let available = on_hand
                .iter()
                .find(|u| u.key.color == line.color && u.key.size == entry.size)
                .map_or(0, |u| u.qty);
            if entry.qty > available {
                return Err(AppError::InsufficientStock {
                    size: entry.size.clone(),
                    requested: entry.qty,
                    available,
                });
            }
        }

        Ok(line)
    }

    /// Move staged lines from one location to another as one unit of work
    pub async fn commit_transfer(
        &self,
        input: TransferInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<MovementInvoice> {
        let to_location_id = input
            .to_location_id
            .ok_or_else(|| AppError::validation("to_location_id", "Destination is required"))?;
        if to_location_id == input.from_location_id {
            return Err(AppError::validation(
                "to_location_id",
                "Source and destination must differ",
            ));
        }
        let lines = normalize_lines(input.lines)?;

        let mut requested: BTreeMap<StockKey, i64> = BTreeMap::new();
        for line in &lines {
            for entry in &line.sizes {
                let key = StockKey::new(line.product_id, input.from_location_id, &line.color, &entry.size);
                add_qty(&mut requested, key, entry.qty, "lines")?;
            }
        }

        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "transfer").await?;
        require_location(tx.as_mut(), input.from_location_id).await?;
        require_location(tx.as_mut(), to_location_id).await?;
        let credited = credited_keys(&lines, to_location_id);
        lock_buckets(tx.as_mut(), requested.keys().chain(&credited)).await?;
        ensure_available(tx.as_mut(), &requested).await?;

        let movements = write_movements(
            tx.as_mut(),
            MovementKind::Transfer,
            Some(input.from_location_id),
            to_location_id,
            &lines,
            MovementMeta {
                date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
                note: input.note,
                operator_name: input.operator_name,
            },
        )
        .await?;
        tx.commit().await?;

        let invoice = single_invoice(movements)?;
        tracing::info!(
            batch_code = %invoice.batch_code,
            from = %input.from_location_id,
            to = %to_location_id,
            total_qty = invoice.total_qty,
            "Transfer committed"
        );
        Ok(invoice)
    }

    /// Credit received goods at a location with no source debit
    pub async fn commit_entry(
        &self,
        input: StockEntryInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<MovementInvoice> {
        let to_location_id = input.to_location_id.unwrap_or(self.central_location_id);
        let lines = normalize_lines(input.lines)?;

        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "stock_entry").await?;
        require_location(tx.as_mut(), to_location_id).await?;
        lock_buckets(tx.as_mut(), &credited_keys(&lines, to_location_id)).await?;

        let movements = write_movements(
            tx.as_mut(),
            MovementKind::ManualEntry,
            None,
            to_location_id,
            &lines,
            MovementMeta {
                date: input.date.unwrap_or_else(|| Utc::now().date_naive()),
                note: input.note,
                operator_name: input.operator_name,
            },
        )
        .await?;
        tx.commit().await?;

        let invoice = single_invoice(movements)?;
        tracing::info!(
            batch_code = %invoice.batch_code,
            to = %to_location_id,
            total_qty = invoice.total_qty,
            "Stock entry committed"
        );
        Ok(invoice)
    }

    /// Recent movements grouped into invoices, newest first
    pub async fn list_invoices(&self, limit: Option<i64>) -> AppResult<Vec<MovementInvoice>> {
        let movements = self
            .store
            .list_movements(limit.unwrap_or(DEFAULT_MOVEMENT_LIMIT))
            .await?;
        Ok(group_into_invoices(movements))
    }
}

struct MovementMeta {
    date: NaiveDate,
    note: Option<String>,
    operator_name: String,
}

/// Write one audit record per line, then its ledger deltas. Every line of
/// the commit shares one batch id.
fn credited_keys(lines: &[StagedLine], location_id: Uuid) -> Vec<StockKey> {
    lines
        .iter()
        .flat_map(|line| {
            line.sizes
                .iter()
                .map(move |entry| StockKey::new(line.product_id, location_id, &line.color, &entry.size))
        })
        .collect()
}

async fn write_movements(
    tx: &mut dyn StoreTx,
    kind: MovementKind,
    from_location_id: Option<Uuid>,
    to_location_id: Uuid,
    lines: &[StagedLine],
    meta: MovementMeta,
) -> AppResult<Vec<StockMovement>> {
    let batch_id = Uuid::new_v4();
    let batch_code = generate_movement_code(kind, meta.date, batch_id);
    let operator_name = match meta.operator_name.trim() {
        "" => "system".to_string(),
        name => name.to_string(),
    };
    let created_at = Utc::now();

    let mut movements = Vec::with_capacity(lines.len());
    for line in lines {
        let movement = StockMovement {
            id: Uuid::new_v4(),
            batch_id,
            batch_code: batch_code.clone(),
            kind,
            date: meta.date,
            from_location_id,
            to_location_id: Some(to_location_id),
            product_id: line.product_id,
            color: line.color.clone(),
            sizes: line.sizes.clone(),
            total_qty: line.total_qty,
            note: meta.note.clone(),
            operator_name: operator_name.clone(),
            created_at,
        };
        tx.insert_movement(&movement).await?;

        for entry in &line.sizes {
            if let Some(source) = from_location_id {
                let key = StockKey::new(line.product_id, source, &line.color, &entry.size);
                apply_delta(tx, &key, -entry.qty).await?;
            }
            let key = StockKey::new(line.product_id, to_location_id, &line.color, &entry.size);
            apply_delta(tx, &key, entry.qty).await?;
        }
        movements.push(movement);
    }

    Ok(movements)
}

async fn require_location(tx: &mut dyn StoreTx, id: Uuid) -> AppResult<()> {
    match tx.get_location(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("Location {}", id))),
    }
}

fn single_invoice(movements: Vec<StockMovement>) -> AppResult<MovementInvoice> {
    group_into_invoices(movements)
        .pop()
        .ok_or_else(|| AppError::Internal("commit produced no movements".to_string()))
}

fn normalize_lines(lines: Vec<StagedLine>) -> AppResult<Vec<StagedLine>> {
    if lines.is_empty() {
        return Err(AppError::validation("lines", "No lines to commit"));
    }
    lines.into_iter().map(normalize_line).collect()
}

/// Sum repeated sizes, drop non-positive quantities, require at least one size
fn normalize_line(line: StagedLine) -> AppResult<StagedLine> {
    let color = line.color.trim().to_string();
    if color.is_empty() {
        return Err(AppError::validation("color", "Color is required"));
    }

    let mut per_size: BTreeMap<String, i64> = BTreeMap::new();
    for entry in line.sizes {
        let size = normalize_size(&entry.size);
        if entry.qty <= 0 || size.is_empty() {
            continue;
        }
        add_qty(&mut per_size, size, entry.qty, "sizes")?;
    }
    if per_size.is_empty() {
        return Err(AppError::validation("sizes", "At least one size quantity is required"));
    }

    let total_qty = sum_qty(per_size.values().copied())
        .ok_or_else(|| AppError::validation("sizes", "Line total is too large"))?;
    let sizes: Vec<SizeQty> = per_size
        .into_iter()
        .map(|(size, qty)| SizeQty { size, qty })
        .collect();
    Ok(StagedLine {
        product_id: line.product_id,
        color,
        total_qty,
        sizes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_sums_and_drops() {
        let line = StagedLine {
            product_id: Uuid::nil(),
            color: " Red ".to_string(),
            sizes: vec![
                SizeQty { size: "m".to_string(), qty: 3 },
                SizeQty { size: "M".to_string(), qty: 2 },
                SizeQty { size: "L".to_string(), qty: 0 },
            ],
            total_qty: 0,
        };

        let line = normalize_line(line).unwrap();

        assert_eq!(line.color, "Red");
        assert_eq!(line.sizes, vec![SizeQty { size: "M".to_string(), qty: 5 }]);
        assert_eq!(line.total_qty, 5);
    }

    #[test]
    fn test_normalize_line_requires_a_size() {
        let line = StagedLine {
            product_id: Uuid::nil(),
            color: "Red".to_string(),
            sizes: vec![SizeQty { size: "S".to_string(), qty: -1 }],
            total_qty: 0,
        };
        assert!(normalize_line(line).is_err());
    }
}
