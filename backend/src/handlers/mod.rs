//! HTTP handlers for the F&B Supply Chain Platform

pub mod internal_request;
pub mod inventory;
pub mod purchase_order;
pub mod receiving;
pub mod transfer;

pub use internal_request::*;
pub use inventory::*;
pub use purchase_order::*;
pub use receiving::*;
pub use transfer::*;

use serde::Serialize;
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::audit::{AuditRecord, AuditService};
use crate::AppState;

/// Record an audit fact for a successful mutation. Fire-and-forget: audit
/// failures never surface to the caller.
pub(crate) fn record_audit<T: Serialize>(
    state: &AppState,
    current_user: &CurrentUser,
    action: &str,
    entity_type: &str,
    entity_id: Uuid,
    after: &T,
) {
    AuditService::new(state.db.clone()).record(AuditRecord {
        tenant_id: current_user.0.tenant_id,
        user_id: current_user.0.user_id,
        action: action.to_string(),
        entity_type: entity_type.to_string(),
        entity_id,
        before: None,
        after: serde_json::to_value(after).ok(),
    });
}
