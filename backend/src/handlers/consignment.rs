//! HTTP handlers for consignment settlement and revenue reporting

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use shared::{DateRange, RevenueSummary, Settlement};

use super::{idempotency_key, LocationQuery};
use crate::error::{AppError, AppResult};
use crate::services::consignment::{
    OutstandingSummary, SettleInvoiceInput, SettledInvoice, SettlementInput, SettlementReport,
};
use crate::services::ConsignmentService;
use crate::store::SettlementFilter;
use crate::AppState;

/// Query parameters for listing settlements
#[derive(Debug, Deserialize)]
pub struct ListSettlementsQuery {
    pub location_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Query parameters for the revenue report
#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Pay off a consignment invoice
pub async fn settle_invoice(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    headers: HeaderMap,
    input: Option<Json<SettleInvoiceInput>>,
) -> AppResult<Json<SettledInvoice>> {
    let service = ConsignmentService::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let settled = service.settle_invoice(sale_id, input, key.as_deref()).await?;
    Ok(Json(settled))
}

/// Unremitted consignment total
pub async fn get_outstanding(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<OutstandingSummary>> {
    let service = ConsignmentService::new(state.store, &state.config);
    let summary = service.outstanding(query.location_id).await?;
    Ok(Json(summary))
}

/// Record a manual branch deposit
pub async fn record_settlement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SettlementInput>,
) -> AppResult<(StatusCode, Json<Settlement>)> {
    let service = ConsignmentService::new(state.store, &state.config);
    let key = idempotency_key(&headers);
    let settlement = service.record_settlement(input, key.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(settlement)))
}

pub async fn list_settlements(
    State(state): State<AppState>,
    Query(query): Query<ListSettlementsQuery>,
) -> AppResult<Json<SettlementReport>> {
    let service = ConsignmentService::new(state.store, &state.config);
    let report = service
        .list_settlements(SettlementFilter {
            location_id: query.location_id,
            from: query.start,
            to: query.end,
        })
        .await?;
    Ok(Json(report))
}

/// Consolidated central revenue, month to date unless a range is given
pub async fn get_revenue(
    State(state): State<AppState>,
    Query(query): Query<RevenueQuery>,
) -> AppResult<Json<RevenueSummary>> {
    let range = match (query.start, query.end) {
        (None, None) => DateRange::month_to_date(Utc::now().date_naive()),
        (start, end) => {
            let today = Utc::now().date_naive();
            let fallback = DateRange::month_to_date(today);
            DateRange::new(start.unwrap_or(fallback.start), end.unwrap_or(today))
                .map_err(|msg| AppError::validation("start", msg))?
        }
    };

    let service = ConsignmentService::new(state.store, &state.config);
    let summary = service.revenue(range).await?;
    Ok(Json(summary))
}
