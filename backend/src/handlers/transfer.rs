//! HTTP handlers for inter-location transfer endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::purchase_order::ApprovalInput;
use crate::services::transfer::{
    CreateTransferInput, ReceiveTransferInput, Transfer, TransferService,
};
use crate::AppState;
use shared::TransferStatus;

/// Query parameters for listing transfers
#[derive(Debug, Deserialize)]
pub struct ListTransfersQuery {
    pub status: Option<TransferStatus>,
}

/// Body for fulfilling a transfer
#[derive(Debug, Deserialize)]
pub struct FulfillTransferInput {
    pub notes: Option<String>,
}

fn transfer_service(state: &AppState) -> TransferService {
    TransferService::new(state.db.clone(), state.config.workflow.clone())
}

/// Create a transfer
pub async fn create_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<Json<Transfer>> {
    check_permission(&current_user.0, "transfers", "create")?;
    let service = transfer_service(&state);
    let transfer = service
        .create(current_user.0.tenant_id, current_user.0.user_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "transfer.create",
        "transfer",
        transfer.id,
        &transfer,
    );
    Ok(Json(transfer))
}

/// List transfers
pub async fn list_transfers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListTransfersQuery>,
) -> AppResult<Json<Vec<Transfer>>> {
    check_permission(&current_user.0, "transfers", "read")?;
    let service = transfer_service(&state);
    let transfers = service.list(current_user.0.tenant_id, query.status).await?;
    Ok(Json(transfers))
}

/// Get a transfer with its lines
pub async fn get_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<Transfer>> {
    check_permission(&current_user.0, "transfers", "read")?;
    let service = transfer_service(&state);
    let transfer = service.get(current_user.0.tenant_id, transfer_id).await?;
    Ok(Json(transfer))
}

/// Approve or reject a pending transfer
pub async fn approve_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ApprovalInput>,
) -> AppResult<Json<Transfer>> {
    check_permission(&current_user.0, "transfers", "approve")?;
    let service = transfer_service(&state);
    let transfer = service
        .approve(current_user.0.tenant_id, current_user.0.user_id, transfer_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "transfer.approve",
        "transfer",
        transfer.id,
        &transfer,
    );
    Ok(Json(transfer))
}

/// Ship an approved transfer
pub async fn fulfill_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<FulfillTransferInput>,
) -> AppResult<Json<Transfer>> {
    check_permission(&current_user.0, "transfers", "fulfill")?;
    let service = transfer_service(&state);
    let transfer = service
        .fulfill(
            current_user.0.tenant_id,
            current_user.0.user_id,
            transfer_id,
            input.notes,
        )
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "transfer.fulfill",
        "transfer",
        transfer.id,
        &transfer,
    );
    Ok(Json(transfer))
}

/// Receive an in-transit transfer at the destination
pub async fn receive_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ReceiveTransferInput>,
) -> AppResult<Json<Transfer>> {
    check_permission(&current_user.0, "transfers", "receive")?;
    let service = transfer_service(&state);
    let transfer = service
        .receive(current_user.0.tenant_id, current_user.0.user_id, transfer_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "transfer.receive",
        "transfer",
        transfer.id,
        &transfer,
    );
    Ok(Json(transfer))
}
