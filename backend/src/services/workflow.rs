//! Production workflow: batch initiation and stage transitions

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{
    calculate_total_cost, generate_batch_code, normalize_size, sample_size_distribution, sum_qty,
    validate_non_negative_amount, validate_size_targets, AccessoryUsage, MaterialUsage, OtherCost, ProductionBatch,
    ProductionModel, ProductionStatus, ProductionType, RawMaterialKind, SizeQty, SizeTarget,
    StageSnapshots, StageTransition, StockKey, WorkflowStage,
};

use super::{add_qty, begin_operation};
use super::ledger::{apply_delta, lock_buckets};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

/// Workflow engine for production batches
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn Store>,
    central_location_id: Uuid,
    default_color: String,
}

/// Planned quantity for one size
#[derive(Debug, Deserialize)]
pub struct SizeTargetInput {
    pub size: String,
    pub target_qty: i64,
}

/// Planned consumption of one raw material or accessory
#[derive(Debug, Deserialize)]
pub struct UsageInput {
    pub id: Uuid,
    pub qty: Decimal,
}

/// Input for initiating a production batch
#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    pub product_id: Uuid,
    pub code: Option<String>,
    #[serde(default)]
    pub variant_color: String,
    pub production_type: ProductionType,
    #[serde(default)]
    pub model: ProductionModel,
    pub start_date: Option<NaiveDate>,
    pub size_targets: Vec<SizeTargetInput>,
    #[serde(default)]
    pub materials: Vec<UsageInput>,
    #[serde(default)]
    pub accessories: Vec<UsageInput>,
    #[serde(default)]
    pub other_costs: Vec<OtherCost>,
    #[serde(default)]
    pub sewing_cost: Decimal,
}

/// Realized quantities submitted when leaving a stage
#[derive(Debug, Default, Deserialize)]
pub struct AdvanceInput {
    #[serde(default)]
    pub realized: BTreeMap<String, i64>,
}

/// Outcome of a stage transition
#[derive(Debug, Clone, Serialize)]
pub struct StageChange {
    pub batch: ProductionBatch,
    pub from: WorkflowStage,
    pub to: WorkflowStage,
    /// Finished-goods deltas booked at the central location
    pub stock_deltas: Vec<SizeQty>,
}

impl WorkflowEngine {
    /// Create a new WorkflowEngine instance
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            central_location_id: config.accounting.central_location_id,
            default_color: config.production.default_color.clone(),
        }
    }

    /// Initiate a batch. Raw material and accessory stock is consumed
    /// immediately and is not returned by later rollbacks.
    pub async fn create_batch(
        &self,
        input: CreateBatchInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<ProductionBatch> {
        let size_targets: Vec<SizeTarget> = input
            .size_targets
            .iter()
            .map(|t| SizeTarget {
                size: normalize_size(&t.size),
                target_qty: t.target_qty,
                result_qty: 0,
            })
            .collect();
        validate_size_targets(&size_targets)
            .map_err(|msg| AppError::validation("size_targets", msg))?;
        validate_usages("materials", &input.materials)?;
        validate_usages("accessories", &input.accessories)?;
        for cost in &input.other_costs {
            if cost.label.trim().is_empty() {
                return Err(AppError::validation("other_costs", "Cost label is required"));
            }
            validate_non_negative_amount(cost.amount)
                .map_err(|msg| AppError::validation("other_costs", msg))?;
        }
        validate_non_negative_amount(input.sewing_cost)
            .map_err(|msg| AppError::validation("sewing_cost", msg))?;
        let target = sum_qty(size_targets.iter().map(|t| t.target_qty))
            .ok_or_else(|| AppError::validation("size_targets", "Planned total is too large"))?;

        let start_date = input.start_date.unwrap_or_else(|| Utc::now().date_naive());
        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "batch_create").await?;

        let mut materials_used = Vec::with_capacity(input.materials.len());
        for usage in &input.materials {
            let price = consume(tx.as_mut(), RawMaterialKind::Material, usage).await?;
            materials_used.push(MaterialUsage {
                material_id: usage.id,
                qty: usage.qty,
                snapshot_price: price,
            });
        }

        let mut accessories_used = Vec::with_capacity(input.accessories.len());
        for usage in &input.accessories {
            let price = consume(tx.as_mut(), RawMaterialKind::Accessory, usage).await?;
            accessories_used.push(AccessoryUsage {
                accessory_id: usage.id,
                qty: usage.qty,
                snapshot_price: price,
            });
        }

        let code = match input.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => code.to_string(),
            None => {
                let seq = tx.next_batch_sequence(start_date.year()).await?;
                generate_batch_code(start_date.year(), seq)
            }
        };

        let total_cost = calculate_total_cost(
            &materials_used,
            &accessories_used,
            &input.other_costs,
            input.sewing_cost,
            target,
        )
        .ok_or_else(|| {
            AppError::validation("total_cost", "Batch cost exceeds the largest storable amount")
        })?;

        let now = Utc::now();
        let first = WorkflowStage::first();
        let batch = ProductionBatch {
            id: Uuid::new_v4(),
            code,
            product_id: input.product_id,
            variant_color: input.variant_color.trim().to_string(),
            production_type: input.production_type,
            model: input.model,
            status: ProductionStatus::Pending,
            current_stage: first,
            progress: first.progress(),
            target,
            actual_output: None,
            start_date,
            end_date: None,
            snapshots: StageSnapshots::default(),
            size_targets,
            materials_used,
            accessories_used,
            other_costs: input.other_costs,
            sewing_cost: input.sewing_cost,
            total_cost,
            created_at: now,
            updated_at: now,
        };

        tx.insert_batch(&batch).await?;
        tx.commit().await?;

        tracing::info!(
            batch_id = %batch.id,
            code = %batch.code,
            target = batch.target,
            total_cost = %batch.total_cost,
            "Production batch created"
        );
        Ok(batch)
    }

    /// Move a batch to the next stage with the realized quantities per size.
    /// Reaching DONE credits finished goods at the central location.
    pub async fn advance(
        &self,
        batch_id: Uuid,
        input: AdvanceInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<StageChange> {
        let mut realized: BTreeMap<String, i64> = BTreeMap::new();
        for (size, qty) in input.realized {
            add_qty(&mut realized, normalize_size(&size), qty, "realized")?;
        }

        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "batch_advance").await?;
        let mut batch = tx
            .lock_batch(batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Production batch".to_string()))?;

        let transition = batch.advance(&realized, Utc::now().date_naive())?;
        let change = self.persist_transition(tx, batch, transition).await?;

        tracing::info!(
            batch_id = %batch_id,
            from = %change.from,
            to = %change.to,
            progress = change.batch.progress,
            "Production stage advanced"
        );
        Ok(change)
    }

    /// Move a batch back one stage. Leaving DONE reverses the
    /// finished-goods credit exactly.
    pub async fn rollback(&self, batch_id: Uuid, idempotency_key: Option<&str>) -> AppResult<StageChange> {
        let mut tx = begin_operation(self.store.as_ref(), idempotency_key, "batch_rollback").await?;
        let mut batch = tx
            .lock_batch(batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Production batch".to_string()))?;

        let transition = batch.rollback()?;
        let change = self.persist_transition(tx, batch, transition).await?;

        tracing::info!(
            batch_id = %batch_id,
            from = %change.from,
            to = %change.to,
            reversed = change.stock_deltas.len(),
            "Production stage rolled back"
        );
        Ok(change)
    }

    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<ProductionBatch> {
        self.store
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Production batch".to_string()))
    }

    pub async fn list_batches(&self, product_id: Option<Uuid>) -> AppResult<Vec<ProductionBatch>> {
        self.store.list_batches(product_id).await
    }

    /// Output per size over the completed sample batches of a product
    pub async fn sample_distribution(&self, product_id: Uuid) -> AppResult<Vec<SizeQty>> {
        let batches = self.store.list_batches(Some(product_id)).await?;
        Ok(sample_size_distribution(&batches, product_id)
            .into_iter()
            .map(|(size, qty)| SizeQty { size, qty })
            .collect())
    }

    /// Colour booked for a batch's finished goods
    fn finished_goods_color<'a>(&'a self, batch: &'a ProductionBatch) -> &'a str {
        if batch.variant_color.trim().is_empty() {
            &self.default_color
        } else {
            batch.variant_color.trim()
        }
    }

    async fn persist_transition(
        &self,
        mut tx: Box<dyn StoreTx>,
        mut batch: ProductionBatch,
        transition: StageTransition,
    ) -> AppResult<StageChange> {
        batch.updated_at = Utc::now();
        tx.update_batch(&batch).await?;

        let color = self.finished_goods_color(&batch).to_string();
        let deltas: Vec<(StockKey, i64)> = transition
            .stock_deltas
            .iter()
            .map(|(size, delta)| {
                let key = StockKey::new(batch.product_id, self.central_location_id, &color, size);
                (key, *delta)
            })
            .collect();
        lock_buckets(tx.as_mut(), deltas.iter().map(|(key, _)| key)).await?;
        for (key, delta) in &deltas {
            apply_delta(tx.as_mut(), key, *delta).await?;
        }
        tx.commit().await?;

        Ok(StageChange {
            batch,
            from: transition.from,
            to: transition.to,
            stock_deltas: transition
                .stock_deltas
                .into_iter()
                .map(|(size, qty)| SizeQty { size, qty })
                .collect(),
        })
    }
}

fn validate_usages(field: &str, usages: &[UsageInput]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for usage in usages {
        if usage.qty <= Decimal::ZERO {
            return Err(AppError::validation(field, "Quantity must be greater than zero"));
        }
        if !seen.insert(usage.id) {
            return Err(AppError::validation(field, "Each item may be listed only once"));
        }
    }
    Ok(())
}

/// Take planned consumption out of stock; returns the unit price at this moment
async fn consume(tx: &mut dyn StoreTx, kind: RawMaterialKind, usage: &UsageInput) -> AppResult<Decimal> {
    let row = tx.adjust_raw_material(kind, usage.id, -usage.qty).await?;
    if row.stock < Decimal::ZERO {
        tracing::warn!(
            id = %row.id,
            name = %row.name,
            stock = %row.stock,
            "{} stock is negative after batch consumption",
            kind.as_str()
        );
    }
    Ok(row.price_per_unit)
}
