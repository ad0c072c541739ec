//! Production batch models and the stage workflow

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::validation::{max_amount, sum_qty, MAX_QTY};

/// Stages a production batch moves through, in fixed order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    Pattern,
    Cut,
    Sew,
    Qc,
    Steam,
    Pack,
    Done,
}

impl WorkflowStage {
    /// The single source of truth for stage ordering
    pub const ORDER: [WorkflowStage; 7] = [
        WorkflowStage::Pattern,
        WorkflowStage::Cut,
        WorkflowStage::Sew,
        WorkflowStage::Qc,
        WorkflowStage::Steam,
        WorkflowStage::Pack,
        WorkflowStage::Done,
    ];

    pub fn first() -> Self {
        Self::ORDER[0]
    }

    pub fn terminal() -> Self {
        Self::ORDER[Self::ORDER.len() - 1]
    }

    pub fn index(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    pub fn next(&self) -> Option<Self> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ORDER[i])
    }

    pub fn is_terminal(&self) -> bool {
        *self == Self::terminal()
    }

    /// Progress percentage for a batch sitting at this stage,
    /// round(index / (stage count - 1) * 100)
    pub fn progress(&self) -> i32 {
        let last = (Self::ORDER.len() - 1) as i32;
        let index = self.index() as i32;
        (index * 200 + last) / (2 * last)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Pattern => "PATTERN",
            WorkflowStage::Cut => "CUT",
            WorkflowStage::Sew => "SEW",
            WorkflowStage::Qc => "QC",
            WorkflowStage::Steam => "STEAM",
            WorkflowStage::Pack => "PACK",
            WorkflowStage::Done => "DONE",
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .iter()
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown workflow stage: {}", s))
    }
}

/// Lifecycle status of a production batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionStatus {
    Pending,
    InProgress,
    Completed,
}

impl ProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStatus::Pending => "PENDING",
            ProductionStatus::InProgress => "IN_PROGRESS",
            ProductionStatus::Completed => "COMPLETED",
        }
    }
}

impl std::str::FromStr for ProductionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ProductionStatus::Pending),
            "IN_PROGRESS" => Ok(ProductionStatus::InProgress),
            "COMPLETED" => Ok(ProductionStatus::Completed),
            other => Err(format!("unknown production status: {}", other)),
        }
    }
}

/// Mass production run or a sample run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionType {
    #[serde(alias = "MASSAL")]
    Mass,
    Sample,
}

impl ProductionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionType::Mass => "MASS",
            ProductionType::Sample => "SAMPLE",
        }
    }
}

impl std::str::FromStr for ProductionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MASS" => Ok(ProductionType::Mass),
            "SAMPLE" => Ok(ProductionType::Sample),
            other => Err(format!("unknown production type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionModel {
    #[default]
    ReadyStock,
    PreOrder,
}

impl ProductionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionModel::ReadyStock => "READY_STOCK",
            ProductionModel::PreOrder => "PRE_ORDER",
        }
    }
}

impl std::str::FromStr for ProductionModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY_STOCK" => Ok(ProductionModel::ReadyStock),
            "PRE_ORDER" => Ok(ProductionModel::PreOrder),
            other => Err(format!("unknown production model: {}", other)),
        }
    }
}

/// Planned vs realized quantity for one garment size
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SizeTarget {
    pub size: String,
    pub target_qty: i64,
    #[serde(default)]
    pub result_qty: i64,
}

/// Raw material consumed by a batch, priced at creation time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialUsage {
    pub material_id: Uuid,
    pub qty: Decimal,
    pub snapshot_price: Decimal,
}

/// Accessory (buttons, zippers, labels) consumed by a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessoryUsage {
    pub accessory_id: Uuid,
    pub qty: Decimal,
    pub snapshot_price: Decimal,
}

/// Additional named cost booked against a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OtherCost {
    pub label: String,
    pub amount: Decimal,
}

/// Realized output recorded when a batch leaves each stage.
/// `Done` has no snapshot: nothing leaves the terminal stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageSnapshots {
    pub pattern: Option<i64>,
    pub cut: Option<i64>,
    pub sew: Option<i64>,
    pub qc: Option<i64>,
    pub steam: Option<i64>,
    pub pack: Option<i64>,
}

impl StageSnapshots {
    pub fn get(&self, stage: WorkflowStage) -> Option<i64> {
        match stage {
            WorkflowStage::Pattern => self.pattern,
            WorkflowStage::Cut => self.cut,
            WorkflowStage::Sew => self.sew,
            WorkflowStage::Qc => self.qc,
            WorkflowStage::Steam => self.steam,
            WorkflowStage::Pack => self.pack,
            WorkflowStage::Done => None,
        }
    }

    pub fn set(&mut self, stage: WorkflowStage, value: Option<i64>) {
        let slot = match stage {
            WorkflowStage::Pattern => &mut self.pattern,
            WorkflowStage::Cut => &mut self.cut,
            WorkflowStage::Sew => &mut self.sew,
            WorkflowStage::Qc => &mut self.qc,
            WorkflowStage::Steam => &mut self.steam,
            WorkflowStage::Pack => &mut self.pack,
            WorkflowStage::Done => return,
        };
        *slot = value;
    }
}

/// One production run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionBatch {
    pub id: Uuid,
    /// Human-facing code (e.g., "PRD-2024-0042")
    pub code: String,
    pub product_id: Uuid,
    pub variant_color: String,
    pub production_type: ProductionType,
    pub model: ProductionModel,
    pub status: ProductionStatus,
    pub current_stage: WorkflowStage,
    pub progress: i32,
    /// Sum of planned quantities over all size targets
    pub target: i64,
    pub actual_output: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub snapshots: StageSnapshots,
    pub size_targets: Vec<SizeTarget>,
    pub materials_used: Vec<MaterialUsage>,
    pub accessories_used: Vec<AccessoryUsage>,
    pub other_costs: Vec<OtherCost>,
    /// Sewing cost per finished piece
    pub sewing_cost: Decimal,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors raised by workflow transitions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("batch is already at the final stage")]
    AlreadyCompleted,

    #[error("batch is already at the first stage")]
    AtFirstStage,

    #[error("size {0} is not part of this batch")]
    UnknownSize(String),

    #[error("realized quantity for size {0} cannot be negative")]
    NegativeQuantity(String),

    #[error("realized quantity for size {0} exceeds the allowed maximum")]
    QuantityOverflow(String),
}

/// Result of a stage transition: where the batch moved and the
/// finished-goods deltas (per size) to book at the central location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTransition {
    pub from: WorkflowStage,
    pub to: WorkflowStage,
    pub stock_deltas: Vec<(String, i64)>,
}

impl ProductionBatch {
    /// Move the batch one stage forward, recording realized quantities per size.
    ///
    /// The realized total is written to the snapshot of the stage being left.
    /// Reaching `Done` completes the batch and yields a positive stock delta for
    /// every size with output.
    pub fn advance(
        &mut self,
        realized: &BTreeMap<String, i64>,
        today: NaiveDate,
    ) -> Result<StageTransition, WorkflowError> {
        let from = self.current_stage;
        let to = from.next().ok_or(WorkflowError::AlreadyCompleted)?;

        for (size, qty) in realized {
            if !self.size_targets.iter().any(|t| &t.size == size) {
                return Err(WorkflowError::UnknownSize(size.clone()));
            }
            if *qty < 0 {
                return Err(WorkflowError::NegativeQuantity(size.clone()));
            }
            if *qty > MAX_QTY {
                return Err(WorkflowError::QuantityOverflow(size.clone()));
            }
        }

        let total_realized = sum_qty(realized.values().copied())
            .ok_or_else(|| WorkflowError::QuantityOverflow("total".to_string()))?;
        for target in &mut self.size_targets {
            target.result_qty = realized.get(&target.size).copied().unwrap_or(0);
        }

        self.snapshots.set(from, Some(total_realized));
        self.current_stage = to;
        self.progress = to.progress();

        let mut stock_deltas = Vec::new();
        if to.is_terminal() {
            self.status = ProductionStatus::Completed;
            self.actual_output = Some(total_realized);
            self.end_date = Some(today);
            stock_deltas = self.finished_goods(1);
        } else {
            self.status = ProductionStatus::InProgress;
        }

        Ok(StageTransition {
            from,
            to,
            stock_deltas,
        })
    }

    /// Move the batch one stage back.
    ///
    /// Leaving a completed batch reverses the finished-goods credit exactly.
    /// The snapshot of the stage re-entered is cleared so the next advance
    /// records a fresh figure.
    pub fn rollback(&mut self) -> Result<StageTransition, WorkflowError> {
        let from = self.current_stage;
        let to = from.previous().ok_or(WorkflowError::AtFirstStage)?;

        let was_completed = self.status == ProductionStatus::Completed || from.is_terminal();
        let stock_deltas = if was_completed {
            self.actual_output = None;
            self.end_date = None;
            self.finished_goods(-1)
        } else {
            Vec::new()
        };

        self.status = ProductionStatus::InProgress;
        self.current_stage = to;
        self.progress = to.progress();
        self.snapshots.set(to, None);

        Ok(StageTransition {
            from,
            to,
            stock_deltas,
        })
    }

    fn finished_goods(&self, sign: i64) -> Vec<(String, i64)> {
        self.size_targets
            .iter()
            .filter(|t| t.result_qty > 0)
            .map(|t| (t.size.clone(), sign * t.result_qty))
            .collect()
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProductionStatus::Completed
    }
}

/// Total cost of a batch:
/// materials + accessories at snapshot price, other costs, and sewing per piece.
/// `None` when the total does not fit a stored amount.
pub fn calculate_total_cost(
    materials: &[MaterialUsage],
    accessories: &[AccessoryUsage],
    other_costs: &[OtherCost],
    sewing_cost: Decimal,
    target: i64,
) -> Option<Decimal> {
    let priced = materials
        .iter()
        .map(|m| m.qty.checked_mul(m.snapshot_price))
        .chain(accessories.iter().map(|a| a.qty.checked_mul(a.snapshot_price)))
        .chain(other_costs.iter().map(|c| Some(c.amount)))
        .chain(std::iter::once(sewing_cost.checked_mul(Decimal::from(target))));

    let mut total = Decimal::ZERO;
    for cost in priced {
        total = total.checked_add(cost?)?;
    }
    Some(total).filter(|total| *total <= max_amount())
}

/// Generate a batch code
pub fn generate_batch_code(year: i32, sequence: u32) -> String {
    format!("PRD-{}-{:04}", year, sequence)
}

/// Output per size over completed sample batches of a product.
/// Falls back to the planned quantity when nothing was recorded for a size.
pub fn sample_size_distribution(batches: &[ProductionBatch], product_id: Uuid) -> Vec<(String, i64)> {
    let mut distribution: BTreeMap<String, i64> = BTreeMap::new();

    batches
        .iter()
        .filter(|b| {
            b.product_id == product_id
                && b.production_type == ProductionType::Sample
                && b.is_completed()
        })
        .flat_map(|b| b.size_targets.iter())
        .for_each(|t| {
            let qty = if t.result_qty > 0 { t.result_qty } else { t.target_qty };
            *distribution.entry(t.size.clone()).or_default() += qty;
        });

    distribution.into_iter().collect()
}
