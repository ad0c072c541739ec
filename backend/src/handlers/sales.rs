//! HTTP handlers for point-of-sale checkout and receivables

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::Sale;

use super::{idempotency_key, LocationQuery};
use crate::error::AppResult;
use crate::services::sales::{CheckoutInput, PaymentInput};
use crate::services::SalesProcessor;
use crate::store::SaleFilter;
use crate::AppState;

/// Query parameters for listing sales
#[derive(Debug, Deserialize)]
pub struct ListSalesQuery {
    pub location_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Check out a cart
pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CheckoutInput>,
) -> AppResult<(StatusCode, Json<Sale>)> {
    let service = SalesProcessor::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let sale = service.checkout(input, key.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List sales
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<ListSalesQuery>,
) -> AppResult<Json<Vec<Sale>>> {
    let service = SalesProcessor::new(state.store, &state.config);
    let sales = service
        .list_sales(SaleFilter {
            location_id: query.location_id,
            from: query.start,
            to: query.end,
            only_outstanding: false,
        })
        .await?;
    Ok(Json(sales))
}

/// Get a sale by ID
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<Sale>> {
    let service = SalesProcessor::new(state.store, &state.config);
    let sale = service.get_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Sales with an open customer receivable
pub async fn list_receivables(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<Sale>>> {
    let service = SalesProcessor::new(state.store, &state.config);
    let sales = service.receivables(query.location_id).await?;
    Ok(Json(sales))
}

/// Apply a customer payment to a sale
pub async fn apply_payment(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<PaymentInput>,
) -> AppResult<Json<Sale>> {
    let service = SalesProcessor::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let sale = service.apply_payment(sale_id, input, key.as_deref()).await?;
    Ok(Json(sale))
}
