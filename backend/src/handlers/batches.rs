//! HTTP handlers for production batches and workflow transitions

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{ProductionBatch, SizeQty};

use super::idempotency_key;
use crate::error::AppResult;
use crate::services::workflow::{AdvanceInput, CreateBatchInput, StageChange};
use crate::services::WorkflowEngine;
use crate::AppState;

/// Query parameters for listing batches
#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    pub product_id: Option<Uuid>,
}

/// Initiate a production batch
pub async fn create_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<(StatusCode, Json<ProductionBatch>)> {
    let service = WorkflowEngine::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let batch = service.create_batch(input, key.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// List batches, newest first
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<ListBatchesQuery>,
) -> AppResult<Json<Vec<ProductionBatch>>> {
    let service = WorkflowEngine::new(state.store, &state.config);
    let batches = service.list_batches(query.product_id).await?;
    Ok(Json(batches))
}

/// Get a batch by ID
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<ProductionBatch>> {
    let service = WorkflowEngine::new(state.store, &state.config);
    let batch = service.get_batch(batch_id).await?;
    Ok(Json(batch))
}

/// Advance a batch to its next stage
pub async fn advance_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<AdvanceInput>,
) -> AppResult<Json<StageChange>> {
    let service = WorkflowEngine::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let change = service.advance(batch_id, input, key.as_deref()).await?;
    Ok(Json(change))
}

/// Roll a batch back to its previous stage
pub async fn rollback_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<StageChange>> {
    let service = WorkflowEngine::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let change = service.rollback(batch_id, key.as_deref()).await?;
    Ok(Json(change))
}

/// Output per size of a product's completed sample batches
pub async fn get_sample_distribution(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<SizeQty>>> {
    let service = WorkflowEngine::new(state.store, &state.config);
    let distribution = service.sample_distribution(product_id).await?;
    Ok(Json(distribution))
}
