//! HTTP handlers for inter-location transfers and stock entries

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use shared::MovementInvoice;

use super::idempotency_key;
use crate::error::AppResult;
use crate::services::transfer::{StageLineInput, StagedLine, StockEntryInput, TransferInput};
use crate::services::TransferOrchestrator;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListMovementsQuery {
    pub limit: Option<i64>,
}

/// Validate one line against the source location's stock
pub async fn stage_line(
    State(state): State<AppState>,
    Json(input): Json<StageLineInput>,
) -> AppResult<Json<StagedLine>> {
    let service = TransferOrchestrator::new(state.store, &state.config);
    let line = service.stage_line(input).await?;
    Ok(Json(line))
}

/// Commit staged lines as a transfer
pub async fn commit_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<TransferInput>,
) -> AppResult<(StatusCode, Json<MovementInvoice>)> {
    let service = TransferOrchestrator::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let invoice = service.commit_transfer(input, key.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Commit received goods with no source location
pub async fn commit_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<StockEntryInput>,
) -> AppResult<(StatusCode, Json<MovementInvoice>)> {
    let service = TransferOrchestrator::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let invoice = service.commit_entry(input, key.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Movement history grouped into invoices
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<ListMovementsQuery>,
) -> AppResult<Json<Vec<MovementInvoice>>> {
    let service = TransferOrchestrator::new(state.store, &state.config);
    let invoices = service.list_invoices(query.limit).await?;
    Ok(Json(invoices))
}
