//! In-process store used by tests and `memory://` deployments
//!
//! A unit of work holds the state lock for its whole lifetime and writes to a
//! staged copy; commit swaps the copy in, drop throws it away.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use shared::{
    Location, LocationType, ProductionBatch, RawMaterial, RawMaterialKind, Sale, Settlement,
    StockKey, StockMovement, StockUnit, DEFAULT_CENTRAL_LOCATION_ID,
};

use super::{SaleFilter, SettlementFilter, Store, StoreTx};
use crate::error::{AppError, AppResult};

/// Store operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    AdjustStock,
    AdjustRawMaterial,
    InsertBatch,
    UpdateBatch,
    InsertSale,
    UpdateSale,
    InsertSettlement,
    InsertMovement,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    locations: HashMap<Uuid, Location>,
    materials: HashMap<Uuid, RawMaterial>,
    accessories: HashMap<Uuid, RawMaterial>,
    stock: BTreeMap<StockKey, StockUnit>,
    batches: HashMap<Uuid, ProductionBatch>,
    batch_sequences: HashMap<i32, u32>,
    sales: HashMap<Uuid, Sale>,
    settlements: Vec<Settlement>,
    movements: Vec<StockMovement>,
    operation_keys: HashSet<String>,
    fail_points: HashSet<FailPoint>,
}

impl MemoryState {
    fn check(&self, point: FailPoint) -> AppResult<()> {
        if self.fail_points.contains(&point) {
            return Err(AppError::StorageError(format!(
                "injected failure at {:?}",
                point
            )));
        }
        Ok(())
    }

    fn raw_materials(&self, kind: RawMaterialKind) -> &HashMap<Uuid, RawMaterial> {
        match kind {
            RawMaterialKind::Material => &self.materials,
            RawMaterialKind::Accessory => &self.accessories,
        }
    }

    fn raw_materials_mut(&mut self, kind: RawMaterialKind) -> &mut HashMap<Uuid, RawMaterial> {
        match kind {
            RawMaterialKind::Material => &mut self.materials,
            RawMaterialKind::Accessory => &mut self.accessories,
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding only the central location
    pub fn seeded() -> Self {
        let mut state = MemoryState::default();
        state.locations.insert(
            DEFAULT_CENTRAL_LOCATION_ID,
            Location {
                id: DEFAULT_CENTRAL_LOCATION_ID,
                name: "Pusat".to_string(),
                location_type: LocationType::Central,
                address: None,
                consignment_margin: Decimal::ZERO,
            },
        );
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn insert_location(&self, location: Location) {
        self.state.lock().await.locations.insert(location.id, location);
    }

    pub async fn insert_raw_material(&self, material: RawMaterial) {
        let mut state = self.state.lock().await;
        state.raw_materials_mut(material.kind).insert(material.id, material);
    }

    /// Make every later call to `point` fail until cleared
    pub async fn fail_on(&self, point: FailPoint) {
        self.state.lock().await.fail_points.insert(point);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.fail_points.clear();
    }

    /// Every ledger bucket and its quantity
    pub async fn stock_snapshot(&self) -> BTreeMap<StockKey, i64> {
        self.state
            .lock()
            .await
            .stock
            .iter()
            .map(|(key, unit)| (key.clone(), unit.qty))
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_stock(&self, product_id: Uuid, location_id: Option<Uuid>) -> AppResult<Vec<StockUnit>> {
        let state = self.state.lock().await;
        Ok(state
            .stock
            .values()
            .filter(|u| u.key.product_id == product_id)
            .filter(|u| location_id.map_or(true, |id| u.key.location_id == id))
            .cloned()
            .collect())
    }

    async fn get_location(&self, id: Uuid) -> AppResult<Option<Location>> {
        Ok(self.state.lock().await.locations.get(&id).cloned())
    }

    async fn get_raw_material(&self, kind: RawMaterialKind, id: Uuid) -> AppResult<Option<RawMaterial>> {
        Ok(self.state.lock().await.raw_materials(kind).get(&id).cloned())
    }

    async fn get_batch(&self, id: Uuid) -> AppResult<Option<ProductionBatch>> {
        Ok(self.state.lock().await.batches.get(&id).cloned())
    }

    async fn list_batches(&self, product_id: Option<Uuid>) -> AppResult<Vec<ProductionBatch>> {
        let state = self.state.lock().await;
        let mut batches: Vec<ProductionBatch> = state
            .batches
            .values()
            .filter(|b| product_id.map_or(true, |id| b.product_id == id))
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(batches)
    }

    async fn get_sale(&self, id: Uuid) -> AppResult<Option<Sale>> {
        Ok(self.state.lock().await.sales.get(&id).cloned())
    }

    async fn list_sales(&self, filter: &SaleFilter) -> AppResult<Vec<Sale>> {
        let state = self.state.lock().await;
        let mut sales: Vec<Sale> = state
            .sales
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sales)
    }

    async fn list_settlements(&self, filter: &SettlementFilter) -> AppResult<Vec<Settlement>> {
        let state = self.state.lock().await;
        let mut settlements: Vec<Settlement> = state
            .settlements
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        settlements.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(settlements)
    }

    async fn list_movements(&self, limit: i64) -> AppResult<Vec<StockMovement>> {
        let state = self.state.lock().await;
        let mut movements = state.movements.clone();
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut kept: HashSet<Uuid> = HashSet::new();
        for movement in &movements {
            if kept.len() >= limit.max(0) as usize {
                break;
            }
            kept.insert(movement.batch_id);
        }
        movements.retain(|m| kept.contains(&m.batch_id));
        Ok(movements)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn claim_operation(&mut self, key: &str, operation: &str) -> AppResult<()> {
        if !self.staged.operation_keys.insert(key.to_string()) {
            return Err(AppError::DuplicateOperation(format!("{} ({})", key, operation)));
        }
        Ok(())
    }

    async fn adjust_stock(&mut self, key: &StockKey, delta: i64) -> AppResult<i64> {
        self.staged.check(FailPoint::AdjustStock)?;
        let unit = self
            .staged
            .stock
            .entry(key.clone())
            .or_insert_with(|| StockUnit {
                key: key.clone(),
                qty: 0,
                updated_at: Utc::now(),
            });
        unit.qty = unit
            .qty
            .checked_add(delta)
            .ok_or_else(|| AppError::validation("qty", "Stock quantity out of range"))?;
        unit.updated_at = Utc::now();
        Ok(unit.qty)
    }

    async fn stock_qty(&mut self, key: &StockKey) -> AppResult<i64> {
        Ok(self.staged.stock.get(key).map_or(0, |u| u.qty))
    }

    async fn lock_stock(&mut self, _key: &StockKey) -> AppResult<()> {
        // the unit of work already holds the whole store
        Ok(())
    }

    async fn adjust_raw_material(
        &mut self,
        kind: RawMaterialKind,
        id: Uuid,
        delta: Decimal,
    ) -> AppResult<RawMaterial> {
        self.staged.check(FailPoint::AdjustRawMaterial)?;
        let material = self
            .staged
            .raw_materials_mut(kind)
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("{} {}", kind.as_str(), id)))?;
        material.stock += delta;
        Ok(material.clone())
    }

    async fn get_location(&mut self, id: Uuid) -> AppResult<Option<Location>> {
        Ok(self.staged.locations.get(&id).cloned())
    }

    async fn next_batch_sequence(&mut self, year: i32) -> AppResult<u32> {
        let seq = self.staged.batch_sequences.entry(year).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn insert_batch(&mut self, batch: &ProductionBatch) -> AppResult<()> {
        self.staged.check(FailPoint::InsertBatch)?;
        self.staged.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn lock_batch(&mut self, id: Uuid) -> AppResult<Option<ProductionBatch>> {
        Ok(self.staged.batches.get(&id).cloned())
    }

    async fn update_batch(&mut self, batch: &ProductionBatch) -> AppResult<()> {
        self.staged.check(FailPoint::UpdateBatch)?;
        match self.staged.batches.get_mut(&batch.id) {
            Some(existing) => {
                *existing = batch.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Production batch".to_string())),
        }
    }

    async fn insert_sale(&mut self, sale: &Sale) -> AppResult<()> {
        self.staged.check(FailPoint::InsertSale)?;
        self.staged.sales.insert(sale.id, sale.clone());
        Ok(())
    }

    async fn lock_sale(&mut self, id: Uuid) -> AppResult<Option<Sale>> {
        Ok(self.staged.sales.get(&id).cloned())
    }

    async fn update_sale(&mut self, sale: &Sale) -> AppResult<()> {
        self.staged.check(FailPoint::UpdateSale)?;
        match self.staged.sales.get_mut(&sale.id) {
            Some(existing) => {
                *existing = sale.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Sale".to_string())),
        }
    }

    async fn insert_settlement(&mut self, settlement: &Settlement) -> AppResult<()> {
        self.staged.check(FailPoint::InsertSettlement)?;
        self.staged.settlements.push(settlement.clone());
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &StockMovement) -> AppResult<()> {
        self.staged.check(FailPoint::InsertMovement)?;
        self.staged.movements.push(movement.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
