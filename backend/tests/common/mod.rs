//! Fixtures shared by the backend integration tests
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use apparel_ops_backend::config::Config;
use apparel_ops_backend::services::ledger::AdjustStockInput;
use apparel_ops_backend::services::StockLedger;
use apparel_ops_backend::store::{MemoryStore, Store};
use shared::{Location, LocationType, StockKey, DEFAULT_CENTRAL_LOCATION_ID};

pub const CENTRAL_ID: Uuid = DEFAULT_CENTRAL_LOCATION_ID;
pub const BRANCH_ID: Uuid = Uuid::from_u128(2);
pub const OTHER_BRANCH_ID: Uuid = Uuid::from_u128(3);
pub const PRODUCT_ID: Uuid = Uuid::from_u128(100);

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn key(location_id: Uuid, color: &str, size: &str) -> StockKey {
    StockKey::new(PRODUCT_ID, location_id, color, size)
}

/// In-memory store with the center and two branches at a 30% margin
pub struct Fixture {
    pub memory: Arc<MemoryStore>,
    pub store: Arc<dyn Store>,
    pub config: Config,
}

impl Fixture {
    pub async fn new() -> Self {
        let memory = Arc::new(MemoryStore::seeded());
        for (id, name) in [(BRANCH_ID, "Cabang Bandung"), (OTHER_BRANCH_ID, "Cabang Solo")] {
            memory
                .insert_location(Location {
                    id,
                    name: name.to_string(),
                    location_type: LocationType::Branch,
                    address: None,
                    consignment_margin: dec("30"),
                })
                .await;
        }
        let store: Arc<dyn Store> = memory.clone();
        Self {
            memory,
            store,
            config: Config::in_memory(),
        }
    }

    /// Put stock in a bucket through the ledger
    pub async fn stock(&self, location_id: Uuid, color: &str, size: &str, qty: i64) {
        StockLedger::new(self.store.clone())
            .adjust(
                AdjustStockInput {
                    product_id: PRODUCT_ID,
                    location_id,
                    color: color.to_string(),
                    size: size.to_string(),
                    delta: qty,
                },
                None,
            )
            .await
            .unwrap();
    }

    pub async fn qty(&self, location_id: Uuid, color: &str, size: &str) -> i64 {
        self.memory
            .stock_snapshot()
            .await
            .get(&key(location_id, color, size))
            .copied()
            .unwrap_or(0)
    }
}
