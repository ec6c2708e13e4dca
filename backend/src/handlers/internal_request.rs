//! HTTP handlers for internal stock request endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::internal_request::{
    ConfirmRequestInput, CreateRequestInput, FulfillRequestInput, InternalRequest,
    InternalRequestService,
};
use crate::AppState;
use shared::RequestStatus;

/// Query parameters for listing internal requests
#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<RequestStatus>,
}

/// Create an internal stock request
pub async fn create_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRequestInput>,
) -> AppResult<Json<InternalRequest>> {
    check_permission(&current_user.0, "requests", "create")?;
    let service = InternalRequestService::new(state.db.clone());
    let request = service
        .create(current_user.0.tenant_id, current_user.0.user_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "request.create",
        "internal_request",
        request.id,
        &request,
    );
    Ok(Json(request))
}

/// List internal requests
pub async fn list_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListRequestsQuery>,
) -> AppResult<Json<Vec<InternalRequest>>> {
    check_permission(&current_user.0, "requests", "read")?;
    let service = InternalRequestService::new(state.db);
    let requests = service.list(current_user.0.tenant_id, query.status).await?;
    Ok(Json(requests))
}

/// Get an internal request with its lines
pub async fn get_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<InternalRequest>> {
    check_permission(&current_user.0, "requests", "read")?;
    let service = InternalRequestService::new(state.db);
    let request = service.get(current_user.0.tenant_id, request_id).await?;
    Ok(Json(request))
}

/// Issue stock against a pending request
pub async fn fulfill_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(input): Json<FulfillRequestInput>,
) -> AppResult<Json<InternalRequest>> {
    check_permission(&current_user.0, "requests", "fulfill")?;
    let service = InternalRequestService::new(state.db.clone());
    let request = service
        .fulfill(current_user.0.tenant_id, current_user.0.user_id, request_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "request.fulfill",
        "internal_request",
        request.id,
        &request,
    );
    Ok(Json(request))
}

/// Confirm receipt of an issued request
pub async fn confirm_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(input): Json<ConfirmRequestInput>,
) -> AppResult<Json<InternalRequest>> {
    check_permission(&current_user.0, "requests", "confirm")?;
    let service = InternalRequestService::new(state.db.clone());
    let request = service
        .confirm(current_user.0.tenant_id, current_user.0.user_id, request_id, input)
        .await?;
    super::record_audit(
        &state,
        &current_user,
        "request.confirm",
        "internal_request",
        request.id,
        &request,
    );
    Ok(Json(request))
}
