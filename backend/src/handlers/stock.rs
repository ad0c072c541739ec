//! HTTP handlers for the finished-goods stock ledger

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use shared::StockUnit;

use super::{idempotency_key, LocationQuery};
use crate::error::AppResult;
use crate::services::ledger::{AdjustStockInput, Availability, StockLevel};
use crate::services::StockLedger;
use crate::AppState;

/// Stock buckets of a product
pub async fn get_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<StockUnit>>> {
    let service = StockLedger::new(state.store);
    let units = service.query(product_id, query.location_id).await?;
    Ok(Json(units))
}

/// Colour and size availability of a product
pub async fn get_availability(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Availability>> {
    let service = StockLedger::new(state.store);
    let availability = service.availability(product_id, query.location_id).await?;
    Ok(Json(availability))
}

/// Manual stock correction
pub async fn adjust_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<StockLevel>> {
    let service = StockLedger::new(state.store);
    let key = idempotency_key(&headers);
    let level = service.adjust(input, key.as_deref()).await?;
    Ok(Json(level))
}
