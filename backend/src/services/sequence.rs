//! Atomic document number allocation
//!
//! Human-readable numbers (PO-00001, REQ-00001, TRF-00001, RCV-YYYYMMDD-NNN)
//! come from a per-tenant counter row. The row is upserted with an atomic
//! increment inside the caller's transaction; counting existing documents at
//! request time would hand out duplicate numbers under concurrent creation.

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppResult;
use shared::DocumentKind;

/// Allocate and format the next document number for a tenant.
///
/// Receiving numbers are additionally scoped to the current UTC day.
pub async fn next_document_number(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    kind: DocumentKind,
) -> AppResult<String> {
    let today = Utc::now().date_naive();
    let period = kind.period(today);

    let value = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO document_sequences (tenant_id, kind, period, last_value)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (tenant_id, kind, period)
        DO UPDATE SET last_value = document_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(tenant_id)
    .bind(kind.as_str())
    .bind(&period)
    .fetch_one(&mut **tx)
    .await?;

    Ok(kind.format_number(today, value))
}
