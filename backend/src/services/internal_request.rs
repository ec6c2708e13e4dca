//! Internal stock request workflow service
//!
//! Intra-company requisition: a requester asks for stock, the warehouse
//! issues it from a chosen location (the only ledger effect), and the
//! requester confirms receipt, recording any discrepancy as paperwork.
//!
//! The availability check at creation is deliberately coarse (summed over
//! all locations) while fulfillment checks the chosen location precisely;
//! a request can therefore pass creation and still be unfulfillable at a
//! single location.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;
use crate::services::inventory::InventoryService;
use crate::services::sequence::next_document_number;
use shared::{
    actor_distinct_from, validate_positive_quantity, DocumentKind, RequestStatus,
    TransactionReference, TransactionType,
};

/// Internal request service
#[derive(Clone)]
pub struct InternalRequestService {
    db: PgPool,
}

/// Database row for an internal request header
#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    request_number: String,
    status: String,
    location_id: Option<Uuid>,
    notes: Option<String>,
    has_discrepancy: bool,
    created_by: Uuid,
    fulfilled_by: Option<Uuid>,
    fulfilled_at: Option<DateTime<Utc>>,
    confirmed_by: Option<Uuid>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Internal request with its lines
#[derive(Debug, Clone, Serialize)]
pub struct InternalRequest {
    pub id: Uuid,
    pub request_number: String,
    pub status: RequestStatus,
    /// Location the stock was issued from, set at fulfillment
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
    pub has_discrepancy: bool,
    pub created_by: Uuid,
    pub fulfilled_by: Option<Uuid>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<InternalRequestLine>,
}

/// Internal request line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InternalRequestLine {
    pub id: Uuid,
    pub item_id: Uuid,
    pub requested_qty: Decimal,
    pub issued_qty: Decimal,
    pub confirmed_qty: Decimal,
    pub notes: Option<String>,
}

/// Input line for creating a request
#[derive(Debug, Deserialize)]
pub struct RequestLineInput {
    pub item_id: Uuid,
    pub requested_qty: Decimal,
    pub notes: Option<String>,
}

/// Input for creating an internal request
#[derive(Debug, Deserialize)]
pub struct CreateRequestInput {
    pub lines: Vec<RequestLineInput>,
    pub notes: Option<String>,
}

/// Input line for issuing stock
#[derive(Debug, Deserialize)]
pub struct FulfillLineInput {
    pub request_line_id: Uuid,
    pub issued_qty: Decimal,
    pub notes: Option<String>,
}

/// Input for fulfilling a request
#[derive(Debug, Deserialize)]
pub struct FulfillRequestInput {
    pub location_id: Uuid,
    pub lines: Vec<FulfillLineInput>,
    pub notes: Option<String>,
}

/// Input line for confirming receipt
#[derive(Debug, Deserialize)]
pub struct ConfirmLineInput {
    pub request_line_id: Uuid,
    pub confirmed_qty: Decimal,
    pub notes: Option<String>,
}

/// Input for confirming a request
#[derive(Debug, Deserialize)]
pub struct ConfirmRequestInput {
    pub lines: Vec<ConfirmLineInput>,
    pub notes: Option<String>,
    pub has_discrepancy: Option<bool>,
}

fn parse_status(s: &str) -> AppResult<RequestStatus> {
    RequestStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("Unknown request status: {}", s)))
}

impl InternalRequestService {
    /// Create a new InternalRequestService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a pending internal request.
    ///
    /// Each requested quantity is checked against the tenant-wide total for
    /// that item; nothing is reserved at any particular location.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        input: CreateRequestInput,
    ) -> AppResult<InternalRequest> {
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "An internal request requires at least one line".to_string(),
            });
        }

        let catalog = CatalogService::new(self.db.clone());
        let inventory = InventoryService::new(self.db.clone());
        for line in &input.lines {
            validate_positive_quantity(line.requested_qty).map_err(|e| AppError::Validation {
                field: "lines".to_string(),
                message: e.to_string(),
            })?;
            let item = catalog.active_item(tenant_id, line.item_id).await?;

            let available = inventory.total_quantity(tenant_id, line.item_id).await?;
            if line.requested_qty > available {
                return Err(AppError::InsufficientStock(format!(
                    "Insufficient stock for item {}: available {}, requested {}",
                    item.sku, available, line.requested_qty
                )));
            }
        }

        let mut tx = self.db.begin().await?;

        let request_number =
            next_document_number(&mut tx, tenant_id, DocumentKind::InternalRequest).await?;

        let request_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO internal_requests (tenant_id, request_number, status, notes, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(&request_number)
        .bind(RequestStatus::Pending.as_str())
        .bind(&input.notes)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            sqlx::query(
                r#"
                INSERT INTO internal_request_lines (request_id, item_id, requested_qty, notes)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(request_id)
            .bind(line.item_id)
            .bind(line.requested_qty)
            .bind(&line.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Internal request {} created", request_number);

        self.get(tenant_id, request_id).await
    }

    /// Issue stock against a pending request.
    ///
    /// The issuer must differ from the requester; the chosen location must
    /// hold every issued quantity. Ledger decreases, line updates and the
    /// status change commit together.
    pub async fn fulfill(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        request_id: Uuid,
        input: FulfillRequestInput,
    ) -> AppResult<InternalRequest> {
        let row = self.fetch(tenant_id, request_id).await?;
        let status = parse_status(&row.status)?;
        if status != RequestStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "Only pending requests can be fulfilled, current status: {}",
                status
            )));
        }

        if !actor_distinct_from(actor_id, &[row.created_by]) {
            return Err(AppError::Forbidden(
                "The requester cannot fulfill their own request".to_string(),
            ));
        }

        let catalog = CatalogService::new(self.db.clone());
        catalog.active_location(tenant_id, input.location_id).await?;

        let lines = self.fetch_lines(request_id).await?;
        if input.lines.len() != lines.len()
            || !lines
                .iter()
                .all(|l| input.lines.iter().any(|i| i.request_line_id == l.id))
        {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "Fulfillment must cover every request line exactly once".to_string(),
            });
        }

        for issue in &input.lines {
            let line = lines
                .iter()
                .find(|l| l.id == issue.request_line_id)
                .ok_or_else(|| AppError::Validation {
                    field: "lines".to_string(),
                    message: format!("Line {} does not belong to this request", issue.request_line_id),
                })?;

            if issue.issued_qty < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: "Issued quantity cannot be negative".to_string(),
                });
            }
            if issue.issued_qty > line.requested_qty {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Issued ({}) exceeds requested ({}) for line {}",
                        issue.issued_qty, line.requested_qty, issue.request_line_id
                    ),
                });
            }
        }

        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE internal_requests
            SET status = $1, fulfilled_by = $2, fulfilled_at = NOW(), location_id = $3,
                notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $5 AND tenant_id = $6 AND status = $7
            "#,
        )
        .bind(RequestStatus::Issued.as_str())
        .bind(actor_id)
        .bind(input.location_id)
        .bind(&input.notes)
        .bind(request_id)
        .bind(tenant_id)
        .bind(RequestStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "Request status changed concurrently".to_string(),
            ));
        }

        for issue in &input.lines {
            sqlx::query(
                r#"
                UPDATE internal_request_lines
                SET issued_qty = $1, notes = COALESCE($2, notes)
                WHERE id = $3 AND request_id = $4
                "#,
            )
            .bind(issue.issued_qty)
            .bind(&issue.notes)
            .bind(issue.request_line_id)
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
        }

        for issue in input.lines.iter().filter(|i| i.issued_qty > Decimal::ZERO) {
            let line = lines
                .iter()
                .find(|l| l.id == issue.request_line_id)
                .ok_or_else(|| AppError::Internal("Request line disappeared".to_string()))?;

            InventoryService::decrease(
                &mut tx,
                tenant_id,
                line.item_id,
                input.location_id,
                issue.issued_qty,
                TransactionType::Outbound,
                TransactionReference::InternalRequest(request_id),
                actor_id,
                issue.notes.as_deref(),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Internal request {} issued", row.request_number);

        self.get(tenant_id, request_id).await
    }

    /// Confirm receipt of an issued request.
    ///
    /// Paperwork only: the stock was already deducted at issue time, so a
    /// discrepancy is recorded on the request rather than re-adjusting the
    /// ledger.
    pub async fn confirm(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        request_id: Uuid,
        input: ConfirmRequestInput,
    ) -> AppResult<InternalRequest> {
        let row = self.fetch(tenant_id, request_id).await?;
        let status = parse_status(&row.status)?;
        if status != RequestStatus::Issued {
            return Err(AppError::InvalidStateTransition(format!(
                "Only issued requests can be confirmed, current status: {}",
                status
            )));
        }

        let lines = self.fetch_lines(request_id).await?;
        if input.lines.len() != lines.len()
            || !lines
                .iter()
                .all(|l| input.lines.iter().any(|i| i.request_line_id == l.id))
        {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "Confirmation must cover every request line exactly once".to_string(),
            });
        }

        let mut discrepancy = input.has_discrepancy.unwrap_or(false);
        for confirm in &input.lines {
            let line = lines
                .iter()
                .find(|l| l.id == confirm.request_line_id)
                .ok_or_else(|| AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Line {} does not belong to this request",
                        confirm.request_line_id
                    ),
                })?;

            if confirm.confirmed_qty < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: "Confirmed quantity cannot be negative".to_string(),
                });
            }
            if confirm.confirmed_qty > line.issued_qty {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Confirmed ({}) exceeds issued ({}) for line {}",
                        confirm.confirmed_qty, line.issued_qty, confirm.request_line_id
                    ),
                });
            }
            if confirm.confirmed_qty != line.issued_qty {
                discrepancy = true;
            }
        }

        let mut tx = self.db.begin().await?;

        for confirm in &input.lines {
            sqlx::query(
                r#"
                UPDATE internal_request_lines
                SET confirmed_qty = $1, notes = COALESCE($2, notes)
                WHERE id = $3 AND request_id = $4
                "#,
            )
            .bind(confirm.confirmed_qty)
            .bind(&confirm.notes)
            .bind(confirm.request_line_id)
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE internal_requests
            SET status = $1, confirmed_by = $2, confirmed_at = NOW(), has_discrepancy = $3,
                notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $5 AND tenant_id = $6 AND status = $7
            "#,
        )
        .bind(RequestStatus::Confirmed.as_str())
        .bind(actor_id)
        .bind(discrepancy)
        .bind(&input.notes)
        .bind(request_id)
        .bind(tenant_id)
        .bind(RequestStatus::Issued.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "Request status changed concurrently".to_string(),
            ));
        }

        tx.commit().await?;

        self.get(tenant_id, request_id).await
    }

    /// Get an internal request with its lines
    pub async fn get(&self, tenant_id: Uuid, request_id: Uuid) -> AppResult<InternalRequest> {
        let row = self.fetch(tenant_id, request_id).await?;
        let lines = self.fetch_lines(request_id).await?;
        build_request(row, lines)
    }

    /// List internal requests, newest first, optionally filtered by status
    pub async fn list(
        &self,
        tenant_id: Uuid,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<InternalRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, request_number, status, location_id, notes, has_discrepancy,
                   created_by, fulfilled_by, fulfilled_at, confirmed_by, confirmed_at,
                   created_at, updated_at
            FROM internal_requests
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.fetch_lines(row.id).await?;
            requests.push(build_request(row, lines)?);
        }
        Ok(requests)
    }

    async fn fetch(&self, tenant_id: Uuid, request_id: Uuid) -> AppResult<RequestRow> {
        sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, request_number, status, location_id, notes, has_discrepancy,
                   created_by, fulfilled_by, fulfilled_at, confirmed_by, confirmed_at,
                   created_at, updated_at
            FROM internal_requests
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(request_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Internal request".to_string()))
    }

    async fn fetch_lines(&self, request_id: Uuid) -> AppResult<Vec<InternalRequestLine>> {
        let lines = sqlx::query_as::<_, InternalRequestLine>(
            r#"
            SELECT id, item_id, requested_qty, issued_qty, confirmed_qty, notes
            FROM internal_request_lines
            WHERE request_id = $1
            ORDER BY id
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.db)
        .await?;
        Ok(lines)
    }
}

fn build_request(row: RequestRow, lines: Vec<InternalRequestLine>) -> AppResult<InternalRequest> {
    let status = parse_status(&row.status)?;
    Ok(InternalRequest {
        id: row.id,
        request_number: row.request_number,
        status,
        location_id: row.location_id,
        notes: row.notes,
        has_discrepancy: row.has_discrepancy,
        created_by: row.created_by,
        fulfilled_by: row.fulfilled_by,
        fulfilled_at: row.fulfilled_at,
        confirmed_by: row.confirmed_by,
        confirmed_at: row.confirmed_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        lines,
    })
}
