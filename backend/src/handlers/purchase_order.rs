//! HTTP handlers for purchase order endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::purchase_order::{
    ApprovalInput, CreatePurchaseOrderInput, PurchaseOrder, PurchaseOrderService,
    PurchaseOrderSummary, UpdatePurchaseOrderInput,
};
use crate::AppState;
use shared::PurchaseOrderStatus;

/// Query parameters for listing purchase orders
#[derive(Debug, Deserialize)]
pub struct ListPurchaseOrdersQuery {
    pub status: Option<PurchaseOrderStatus>,
}

/// Create a purchase order in draft status
pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "po", "create")?;
    let service = PurchaseOrderService::new(state.db.clone());
    let po = service
        .create(current_user.0.tenant_id, current_user.0.user_id, input)
        .await?;
    super::record_audit(&state, &current_user, "po.create", "purchase_order", po.id, &po);
    Ok(Json(po))
}

/// List purchase orders
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListPurchaseOrdersQuery>,
) -> AppResult<Json<Vec<PurchaseOrderSummary>>> {
    check_permission(&current_user.0, "po", "read")?;
    let service = PurchaseOrderService::new(state.db);
    let orders = service.list(current_user.0.tenant_id, query.status).await?;
    Ok(Json(orders))
}

/// Get a purchase order with its lines
pub async fn get_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "po", "read")?;
    let service = PurchaseOrderService::new(state.db);
    let po = service.get(current_user.0.tenant_id, po_id).await?;
    Ok(Json(po))
}

/// Edit a draft purchase order
pub async fn update_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseOrderInput>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "po", "edit")?;
    let service = PurchaseOrderService::new(state.db.clone());
    let po = service
        .update_draft(current_user.0.tenant_id, po_id, input)
        .await?;
    super::record_audit(&state, &current_user, "po.edit", "purchase_order", po.id, &po);
    Ok(Json(po))
}

/// Submit a draft purchase order for approval
pub async fn submit_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "po", "submit")?;
    let service = PurchaseOrderService::new(state.db.clone());
    let po = service.submit(current_user.0.tenant_id, po_id).await?;
    super::record_audit(&state, &current_user, "po.submit", "purchase_order", po.id, &po);
    Ok(Json(po))
}

/// Approve or reject a submitted purchase order
pub async fn approve_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
    Json(input): Json<ApprovalInput>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "po", "approve")?;
    let service = PurchaseOrderService::new(state.db.clone());
    let po = service
        .approve(current_user.0.tenant_id, current_user.0.user_id, po_id, input)
        .await?;
    super::record_audit(&state, &current_user, "po.approve", "purchase_order", po.id, &po);
    Ok(Json(po))
}

/// Mark an approved purchase order as sent to the supplier
pub async fn send_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "po", "send")?;
    let service = PurchaseOrderService::new(state.db.clone());
    let po = service.mark_sent(current_user.0.tenant_id, po_id).await?;
    super::record_audit(&state, &current_user, "po.send", "purchase_order", po.id, &po);
    Ok(Json(po))
}
