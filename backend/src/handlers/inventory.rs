//! HTTP handlers for inventory ledger endpoints
//!
//! Reporting reads (positions, transaction history, valuations) plus the
//! manual adjustment entry point.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::inventory::{
    AdjustStockInput, CategoryValuation, InventoryPosition, InventoryService, LedgerTransaction,
    LocationValuation, TransactionFilter,
};
use crate::AppState;
use shared::{PaginatedResponse, Pagination, TransactionType};

/// Query parameters for listing positions
#[derive(Debug, Deserialize)]
pub struct ListPositionsQuery {
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

/// List stock positions, optionally filtered by item and/or location
pub async fn list_positions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListPositionsQuery>,
) -> AppResult<Json<Vec<InventoryPosition>>> {
    check_permission(&current_user.0, "inventory", "read")?;
    let service = InventoryService::new(state.db);
    let positions = service
        .list_positions(current_user.0.tenant_id, query.item_id, query.location_id)
        .await?;
    Ok(Json(positions))
}

/// Get the position of one item at one location (zero if absent)
pub async fn get_position(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((item_id, location_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<InventoryPosition>> {
    check_permission(&current_user.0, "inventory", "read")?;
    let service = InventoryService::new(state.db);
    let position = service
        .get_position(current_user.0.tenant_id, item_id, location_id)
        .await?;
    Ok(Json(position))
}

/// Query parameters for the transaction history
#[derive(Debug, Deserialize)]
pub struct TransactionHistoryQuery {
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Transaction history with optional filters, paginated
pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<TransactionHistoryQuery>,
) -> AppResult<Json<PaginatedResponse<LedgerTransaction>>> {
    check_permission(&current_user.0, "inventory", "read")?;

    let defaults = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let filter = TransactionFilter {
        item_id: query.item_id,
        location_id: query.location_id,
        transaction_type: query.transaction_type,
        from_date: query.from_date,
        to_date: query.to_date,
    };

    let service = InventoryService::new(state.db);
    let transactions = service
        .list_transactions(current_user.0.tenant_id, filter, pagination)
        .await?;
    Ok(Json(transactions))
}

/// Stock valuation aggregated by location
pub async fn valuation_by_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<LocationValuation>>> {
    check_permission(&current_user.0, "inventory", "read")?;
    let service = InventoryService::new(state.db);
    let valuations = service.valuation_by_location(current_user.0.tenant_id).await?;
    Ok(Json(valuations))
}

/// Stock valuation aggregated by item category
pub async fn valuation_by_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<CategoryValuation>>> {
    check_permission(&current_user.0, "inventory", "read")?;
    let service = InventoryService::new(state.db);
    let valuations = service.valuation_by_category(current_user.0.tenant_id).await?;
    Ok(Json(valuations))
}

/// Record a manual stock adjustment
pub async fn adjust_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<Json<InventoryPosition>> {
    check_permission(&current_user.0, "inventory", "adjust")?;
    let service = InventoryService::new(state.db.clone());
    let position = service
        .adjust(current_user.0.tenant_id, current_user.0.user_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "inventory.adjust",
        "inventory_position",
        position.item_id,
        &position,
    );
    Ok(Json(position))
}
