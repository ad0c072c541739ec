//! Route definitions for the apparel operations API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Finished-goods ledger
        .nest("/stock", stock_routes())
        // Production workflow
        .nest("/batches", batch_routes())
        // Point of sale and receivables
        .nest("/sales", sales_routes())
        // Consignment accounting
        .nest("/consignment", consignment_routes())
        // Transfers and stock entries
        .route("/transfers", post(handlers::commit_transfer))
        .route("/transfers/stage", post(handlers::stage_line))
        .route("/stock-entries", post(handlers::commit_entry))
        .route("/movements", get(handlers::list_movements))
}

/// Stock ledger routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/adjust", post(handlers::adjust_stock))
        .route("/:product_id", get(handlers::get_stock))
        .route("/:product_id/availability", get(handlers::get_availability))
}

/// Production batch routes
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::create_batch))
        .route("/samples/:product_id", get(handlers::get_sample_distribution))
        .route("/:batch_id", get(handlers::get_batch))
        .route("/:batch_id/advance", post(handlers::advance_batch))
        .route("/:batch_id/rollback", post(handlers::rollback_batch))
}

/// Sales routes
fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales))
        .route("/checkout", post(handlers::checkout))
        .route("/receivables", get(handlers::list_receivables))
        .route("/:sale_id", get(handlers::get_sale))
        .route("/:sale_id/payments", post(handlers::apply_payment))
}

/// Consignment routes
fn consignment_routes() -> Router<AppState> {
    Router::new()
        .route("/invoices/:sale_id/settle", post(handlers::settle_invoice))
        .route("/outstanding", get(handlers::get_outstanding))
        .route(
            "/settlements",
            get(handlers::list_settlements).post(handlers::record_settlement),
        )
        .route("/revenue", get(handlers::get_revenue))
}
