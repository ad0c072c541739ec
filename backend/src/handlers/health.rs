//! Liveness and store connectivity

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub store_reachable: bool,
}

/// Reports 503 while the store cannot be reached
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match state.store.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(store = state.store.kind(), error = %err, "Store ping failed");
            false
        }
    };

    let (code, status) = if reachable {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store: state.store.kind(),
            store_reachable: reachable,
        }),
    )
}
