//! HTTP handlers for the apparel operations API

mod batches;
mod consignment;
mod health;
mod sales;
mod stock;
mod transfers;

pub use batches::*;
pub use consignment::*;
pub use health::*;
pub use sales::*;
pub use stock::*;
pub use transfers::*;

use axum::http::HeaderMap;
use serde::Deserialize;
use uuid::Uuid;

/// Header carrying the caller's key for exactly-once operations
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Non-empty idempotency key from the request headers
pub(crate) fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Optional location scope shared by listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub location_id: Option<Uuid>,
}
