//! Persistence port for stock, production and sales records
//!
//! Every composite business operation runs inside one [`StoreTx`]. Dropping a
//! transaction without calling [`StoreTx::commit`] discards all of its writes,
//! including the idempotency key it claimed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::{
    Location, ProductionBatch, RawMaterial, RawMaterialKind, Sale, Settlement, StockKey,
    StockMovement, StockUnit,
};

use crate::config::DatabaseConfig;
use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

/// Filter for sale listings
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub location_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub only_outstanding: bool,
}

impl SaleFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        self.location_id.map_or(true, |id| sale.location_id == id)
            && self.from.map_or(true, |d| sale.date >= d)
            && self.to.map_or(true, |d| sale.date <= d)
            && (!self.only_outstanding || sale.remaining_amount > Decimal::ZERO)
    }
}

/// Filter for settlement listings
#[derive(Debug, Clone, Default)]
pub struct SettlementFilter {
    pub location_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SettlementFilter {
    pub fn matches(&self, settlement: &Settlement) -> bool {
        self.location_id.map_or(true, |id| settlement.location_id == id)
            && self.from.map_or(true, |d| settlement.date >= d)
            && self.to.map_or(true, |d| settlement.date <= d)
    }
}

/// Read side of the store, plus the entry point for units of work
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Backend name reported by the health endpoint
    fn kind(&self) -> &'static str;

    /// Connectivity check
    async fn ping(&self) -> AppResult<()>;

    async fn list_stock(&self, product_id: Uuid, location_id: Option<Uuid>) -> AppResult<Vec<StockUnit>>;

    async fn get_location(&self, id: Uuid) -> AppResult<Option<Location>>;

    async fn get_raw_material(&self, kind: RawMaterialKind, id: Uuid) -> AppResult<Option<RawMaterial>>;

    async fn get_batch(&self, id: Uuid) -> AppResult<Option<ProductionBatch>>;

    /// Newest first
    async fn list_batches(&self, product_id: Option<Uuid>) -> AppResult<Vec<ProductionBatch>>;

    async fn get_sale(&self, id: Uuid) -> AppResult<Option<Sale>>;

    /// Newest first
    async fn list_sales(&self, filter: &SaleFilter) -> AppResult<Vec<Sale>>;

    /// Newest first
    async fn list_settlements(&self, filter: &SettlementFilter) -> AppResult<Vec<Settlement>>;

    /// Newest first: every line of the `limit` most recent movement batches
    async fn list_movements(&self, limit: i64) -> AppResult<Vec<StockMovement>>;
}

/// One unit of work. Reads inside it see its own writes.
#[async_trait]
pub trait StoreTx: Send {
    /// Record that `key` has been used. Fails with `DuplicateOperation`
    /// when the key was already claimed by a committed operation.
    async fn claim_operation(&mut self, key: &str, operation: &str) -> AppResult<()>;

    /// Apply `delta` to the bucket atomically, creating it when absent.
    /// Returns the resulting quantity.
    async fn adjust_stock(&mut self, key: &StockKey, delta: i64) -> AppResult<i64>;

    /// Quantity on hand, locking the bucket for the rest of the transaction.
    /// Absent buckets read as zero.
    async fn stock_qty(&mut self, key: &StockKey) -> AppResult<i64>;

    /// Lock the bucket for the rest of the transaction, creating it empty
    /// when absent so later writes find the lock already held
    async fn lock_stock(&mut self, key: &StockKey) -> AppResult<()>;

    /// Apply `delta` to a raw material or accessory; `NotFound` if absent
    async fn adjust_raw_material(
        &mut self,
        kind: RawMaterialKind,
        id: Uuid,
        delta: Decimal,
    ) -> AppResult<RawMaterial>;

    async fn get_location(&mut self, id: Uuid) -> AppResult<Option<Location>>;

    /// Next batch code sequence for `year`, starting at 1
    async fn next_batch_sequence(&mut self, year: i32) -> AppResult<u32>;

    async fn insert_batch(&mut self, batch: &ProductionBatch) -> AppResult<()>;

    /// Read a batch and lock it for the rest of the transaction
    async fn lock_batch(&mut self, id: Uuid) -> AppResult<Option<ProductionBatch>>;

    async fn update_batch(&mut self, batch: &ProductionBatch) -> AppResult<()>;

    async fn insert_sale(&mut self, sale: &Sale) -> AppResult<()>;

    /// Read a sale and lock it for the rest of the transaction
    async fn lock_sale(&mut self, id: Uuid) -> AppResult<Option<Sale>>;

    async fn update_sale(&mut self, sale: &Sale) -> AppResult<()>;

    async fn insert_settlement(&mut self, settlement: &Settlement) -> AppResult<()>;

    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Connect the store selected by the database URL
pub async fn connect(config: &DatabaseConfig, run_migrations: bool) -> AppResult<Arc<dyn Store>> {
    if config.is_memory() {
        tracing::warn!("Using in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::seeded()));
    }

    let store = PgStore::connect(config).await?;
    if run_migrations {
        store.migrate().await?;
    }
    Ok(Arc::new(store))
}
