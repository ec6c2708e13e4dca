//! HTTP handlers for receiving pipeline endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::receiving::{
    CreateReceivingInput, QcInspectInput, Receiving, ReceivingService, WarehouseReceiveInput,
};
use crate::AppState;
use shared::ReceivingStatus;

/// Query parameters for listing receivings
#[derive(Debug, Deserialize)]
pub struct ListReceivingsQuery {
    pub status: Option<ReceivingStatus>,
    pub purchase_order_id: Option<Uuid>,
}

/// Create a receiving record (procurement verification)
pub async fn create_receiving(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateReceivingInput>,
) -> AppResult<Json<Receiving>> {
    check_permission(&current_user.0, "receiving", "verify")?;
    let service = ReceivingService::new(state.db.clone());
    let receiving = service
        .create(current_user.0.tenant_id, current_user.0.user_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "receiving.verify",
        "receiving",
        receiving.id,
        &receiving,
    );
    Ok(Json(receiving))
}

/// List receivings
pub async fn list_receivings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListReceivingsQuery>,
) -> AppResult<Json<Vec<Receiving>>> {
    check_permission(&current_user.0, "receiving", "read")?;
    let service = ReceivingService::new(state.db);
    let receivings = service
        .list(current_user.0.tenant_id, query.status, query.purchase_order_id)
        .await?;
    Ok(Json(receivings))
}

/// Get a receiving record with its lines
pub async fn get_receiving(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(receiving_id): Path<Uuid>,
) -> AppResult<Json<Receiving>> {
    check_permission(&current_user.0, "receiving", "read")?;
    let service = ReceivingService::new(state.db);
    let receiving = service.get(current_user.0.tenant_id, receiving_id).await?;
    Ok(Json(receiving))
}

/// Perform the QC inspection on a verified receiving
pub async fn qc_inspect_receiving(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(receiving_id): Path<Uuid>,
    Json(input): Json<QcInspectInput>,
) -> AppResult<Json<Receiving>> {
    check_permission(&current_user.0, "receiving", "qc_inspect")?;
    let service = ReceivingService::new(state.db.clone());
    let receiving = service
        .qc_inspect(current_user.0.tenant_id, current_user.0.user_id, receiving_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "receiving.qc_inspect",
        "receiving",
        receiving.id,
        &receiving,
    );
    Ok(Json(receiving))
}

/// Book a QC-approved receiving into inventory
pub async fn warehouse_receive(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(receiving_id): Path<Uuid>,
    Json(input): Json<WarehouseReceiveInput>,
) -> AppResult<Json<Receiving>> {
    check_permission(&current_user.0, "receiving", "receive")?;
    let service = ReceivingService::new(state.db.clone());
    let receiving = service
        .warehouse_receive(current_user.0.tenant_id, current_user.0.user_id, receiving_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "receiving.receive",
        "receiving",
        receiving.id,
        &receiving,
    );
    Ok(Json(receiving))
}
