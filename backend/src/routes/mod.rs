//! Route definitions for the F&B Supply Chain Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Protected routes - purchase orders
        .nest("/purchase-orders", purchase_order_routes())
        // Protected routes - receiving pipeline
        .nest("/receivings", receiving_routes())
        // Protected routes - internal stock requests
        .nest("/requests", request_routes())
        // Protected routes - inter-location transfers
        .nest("/transfers", transfer_routes())
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes())
}

/// Purchase order routes (protected)
fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route(
            "/:po_id",
            get(handlers::get_purchase_order).put(handlers::update_purchase_order),
        )
        .route("/:po_id/submit", post(handlers::submit_purchase_order))
        .route("/:po_id/approve", post(handlers::approve_purchase_order))
        .route("/:po_id/send", post(handlers::send_purchase_order))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Receiving pipeline routes (protected)
fn receiving_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_receivings).post(handlers::create_receiving),
        )
        .route("/:receiving_id", get(handlers::get_receiving))
        .route("/:receiving_id/qc-inspect", post(handlers::qc_inspect_receiving))
        .route("/:receiving_id/receive", post(handlers::warehouse_receive))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Internal request routes (protected)
fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_requests).post(handlers::create_request))
        .route("/:request_id", get(handlers::get_request))
        .route("/:request_id/fulfill", post(handlers::fulfill_request))
        .route("/:request_id/confirm", post(handlers::confirm_request))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Transfer routes (protected)
fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_transfers).post(handlers::create_transfer))
        .route("/:transfer_id", get(handlers::get_transfer))
        .route("/:transfer_id/approve", post(handlers::approve_transfer))
        .route("/:transfer_id/fulfill", post(handlers::fulfill_transfer))
        .route("/:transfer_id/receive", post(handlers::receive_transfer))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Inventory ledger routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        // Positions
        .route("/positions", get(handlers::list_positions))
        .route(
            "/positions/:item_id/:location_id",
            get(handlers::get_position),
        )
        // Transaction history
        .route("/transactions", get(handlers::list_transactions))
        // Valuations
        .route("/valuation/locations", get(handlers::valuation_by_location))
        .route("/valuation/categories", get(handlers::valuation_by_category))
        // Manual adjustments
        .route("/adjustments", post(handlers::adjust_stock))
        .route_layer(middleware::from_fn(auth_middleware))
}
