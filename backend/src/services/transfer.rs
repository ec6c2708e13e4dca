//! Inter-location transfer workflow service
//!
//! Moves stock between two locations of the same tenant. Low-value
//! transfers are auto-approved at creation; transfers above the configured
//! threshold wait for explicit approval. Stock leaves the source at
//! fulfillment and arrives at the destination at receipt, carrying the unit
//! cost captured from the source position when the transfer was created.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;
use crate::services::inventory::InventoryService;
use crate::services::purchase_order::ApprovalInput;
use crate::services::sequence::next_document_number;
use shared::{
    actor_distinct_from, requires_approval, validate_positive_quantity, ApprovalAction,
    DocumentKind, TransactionReference, TransactionType, TransferStatus,
};

/// Transfer service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
    workflow: WorkflowConfig,
}

/// Database row for a transfer header
#[derive(Debug, FromRow)]
struct TransferRow {
    id: Uuid,
    transfer_number: String,
    status: String,
    from_location_id: Uuid,
    to_location_id: Uuid,
    estimated_value: Decimal,
    notes: Option<String>,
    created_by: Uuid,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    fulfilled_by: Option<Uuid>,
    fulfilled_at: Option<DateTime<Utc>>,
    received_by: Option<Uuid>,
    received_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Transfer with its lines
#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub id: Uuid,
    pub transfer_number: String,
    pub status: TransferStatus,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub estimated_value: Decimal,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub fulfilled_by: Option<Uuid>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<TransferLine>,
}

/// Transfer line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransferLine {
    pub id: Uuid,
    pub item_id: Uuid,
    /// Quantity shipped from the source
    pub quantity: Decimal,
    /// Quantity received at the destination, at most the shipped quantity
    pub received_qty: Decimal,
    /// Source position's average cost at creation time
    pub unit_cost: Decimal,
    pub notes: Option<String>,
}

/// Input line for creating a transfer
#[derive(Debug, Deserialize)]
pub struct TransferLineInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

/// Input for creating a transfer
#[derive(Debug, Deserialize)]
pub struct CreateTransferInput {
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub lines: Vec<TransferLineInput>,
    pub notes: Option<String>,
}

/// Input line for receiving a transfer
#[derive(Debug, Deserialize)]
pub struct ReceiveLineInput {
    pub transfer_line_id: Uuid,
    pub received_qty: Decimal,
    pub notes: Option<String>,
}

/// Input for receiving a transfer
#[derive(Debug, Deserialize)]
pub struct ReceiveTransferInput {
    pub lines: Vec<ReceiveLineInput>,
    pub notes: Option<String>,
}

fn parse_status(s: &str) -> AppResult<TransferStatus> {
    TransferStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("Unknown transfer status: {}", s)))
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool, workflow: WorkflowConfig) -> Self {
        Self { db, workflow }
    }

    /// Create a transfer.
    ///
    /// Source stock is checked but not yet deducted; only fulfillment moves
    /// stock. The estimated value (quantities at the source positions'
    /// average cost) decides whether explicit approval is required.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        input: CreateTransferInput,
    ) -> AppResult<Transfer> {
        if input.from_location_id == input.to_location_id {
            return Err(AppError::Validation {
                field: "to_location_id".to_string(),
                message: "Source and destination locations must differ".to_string(),
            });
        }

        let catalog = CatalogService::new(self.db.clone());
        catalog.active_location(tenant_id, input.from_location_id).await?;
        catalog.active_location(tenant_id, input.to_location_id).await?;

        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "A transfer requires at least one line".to_string(),
            });
        }

        let inventory = InventoryService::new(self.db.clone());
        let mut estimated_value = Decimal::ZERO;
        let mut costed = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            validate_positive_quantity(line.quantity).map_err(|e| AppError::Validation {
                field: "lines".to_string(),
                message: e.to_string(),
            })?;
            let item = catalog.active_item(tenant_id, line.item_id).await?;

            let position = inventory
                .get_position(tenant_id, line.item_id, input.from_location_id)
                .await?;
            if position.quantity < line.quantity {
                return Err(AppError::InsufficientStock(format!(
                    "Insufficient stock at source location for item {}: available {}, requested {}",
                    item.sku, position.quantity, line.quantity
                )));
            }

            estimated_value += line.quantity * position.average_cost;
            costed.push((line, position.average_cost));
        }

        let status = if requires_approval(estimated_value, self.workflow.transfer_approval_threshold)
        {
            TransferStatus::Pending
        } else {
            TransferStatus::Approved
        };

        let mut tx = self.db.begin().await?;

        let transfer_number = next_document_number(&mut tx, tenant_id, DocumentKind::Transfer).await?;

        let transfer_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO transfers
                (tenant_id, transfer_number, status, from_location_id, to_location_id,
                 estimated_value, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(&transfer_number)
        .bind(status.as_str())
        .bind(input.from_location_id)
        .bind(input.to_location_id)
        .bind(estimated_value)
        .bind(&input.notes)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        for (line, unit_cost) in &costed {
            sqlx::query(
                r#"
                INSERT INTO transfer_lines (transfer_id, item_id, quantity, unit_cost, notes)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(transfer_id)
            .bind(line.item_id)
            .bind(line.quantity)
            .bind(unit_cost)
            .bind(&line.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Transfer {} created ({}, value {})",
            transfer_number,
            status,
            estimated_value
        );

        self.get(tenant_id, transfer_id).await
    }

    /// Approve or reject a pending transfer. The approver must not be the
    /// creator.
    pub async fn approve(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        transfer_id: Uuid,
        input: ApprovalInput,
    ) -> AppResult<Transfer> {
        let row = self.fetch(tenant_id, transfer_id).await?;
        let status = parse_status(&row.status)?;
        if status != TransferStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "Only pending transfers can be decided, current status: {}",
                status
            )));
        }

        if !actor_distinct_from(actor_id, &[row.created_by]) {
            return Err(AppError::Forbidden(
                "You cannot approve your own transfer".to_string(),
            ));
        }

        match input.action {
            ApprovalAction::Approve => {
                let result = sqlx::query(
                    r#"
                    UPDATE transfers
                    SET status = $1, approved_by = $2, approved_at = NOW(), updated_at = NOW()
                    WHERE id = $3 AND tenant_id = $4 AND status = $5
                    "#,
                )
                .bind(TransferStatus::Approved.as_str())
                .bind(actor_id)
                .bind(transfer_id)
                .bind(tenant_id)
                .bind(TransferStatus::Pending.as_str())
                .execute(&self.db)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::InvalidStateTransition(
                        "Transfer status changed concurrently".to_string(),
                    ));
                }
            }
            ApprovalAction::Reject => {
                let notes = match (&row.notes, &input.reason) {
                    (Some(notes), Some(reason)) => format!("{}\nRejected: {}", notes, reason),
                    (None, Some(reason)) => format!("Rejected: {}", reason),
                    (Some(notes), None) => notes.clone(),
                    (None, None) => String::new(),
                };

                let result = sqlx::query(
                    r#"
                    UPDATE transfers
                    SET status = $1, notes = NULLIF($2, ''), updated_at = NOW()
                    WHERE id = $3 AND tenant_id = $4 AND status = $5
                    "#,
                )
                .bind(TransferStatus::Cancelled.as_str())
                .bind(&notes)
                .bind(transfer_id)
                .bind(tenant_id)
                .bind(TransferStatus::Pending.as_str())
                .execute(&self.db)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::InvalidStateTransition(
                        "Transfer status changed concurrently".to_string(),
                    ));
                }
            }
        }

        self.get(tenant_id, transfer_id).await
    }

    /// Ship an approved transfer: deduct every line from the source
    /// location and put the transfer in transit.
    ///
    /// Stock sufficiency is re-validated here; the source may have been
    /// drained since the transfer was created, in which case the whole
    /// operation fails and the transfer stays approved.
    pub async fn fulfill(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        transfer_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<Transfer> {
        let row = self.fetch(tenant_id, transfer_id).await?;
        let status = parse_status(&row.status)?;
        if status != TransferStatus::Approved {
            return Err(AppError::InvalidStateTransition(format!(
                "Only approved transfers can be fulfilled, current status: {}",
                status
            )));
        }

        // Historically fulfillment had no segregation-of-duties rule, unlike
        // the other workflows; enforced only when configured on
        if self.workflow.transfer_fulfill_requires_distinct_actor {
            let mut prior = vec![row.created_by];
            if let Some(approved_by) = row.approved_by {
                prior.push(approved_by);
            }
            if !actor_distinct_from(actor_id, &prior) {
                return Err(AppError::Forbidden(
                    "Transfer fulfillment requires an actor distinct from the creator and approver"
                        .to_string(),
                ));
            }
        }

        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE transfers
            SET status = $1, fulfilled_by = $2, fulfilled_at = NOW(),
                notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $4 AND tenant_id = $5 AND status = $6
            "#,
        )
        .bind(TransferStatus::InTransit.as_str())
        .bind(actor_id)
        .bind(&notes)
        .bind(transfer_id)
        .bind(tenant_id)
        .bind(TransferStatus::Approved.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "Transfer status changed concurrently".to_string(),
            ));
        }

        let lines = sqlx::query_as::<_, TransferLine>(
            r#"
            SELECT id, item_id, quantity, received_qty, unit_cost, notes
            FROM transfer_lines
            WHERE transfer_id = $1
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&mut *tx)
        .await?;

        for line in &lines {
            InventoryService::decrease(
                &mut tx,
                tenant_id,
                line.item_id,
                row.from_location_id,
                line.quantity,
                TransactionType::TransferOut,
                TransactionReference::Transfer(transfer_id),
                actor_id,
                line.notes.as_deref(),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Transfer {} in transit", row.transfer_number);

        self.get(tenant_id, transfer_id).await
    }

    /// Receive an in-transit transfer at the destination.
    ///
    /// Under-receiving is allowed (damage in transit); each received
    /// quantity arrives at the unit cost captured when the transfer was
    /// created.
    pub async fn receive(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        transfer_id: Uuid,
        input: ReceiveTransferInput,
    ) -> AppResult<Transfer> {
        let row = self.fetch(tenant_id, transfer_id).await?;
        let status = parse_status(&row.status)?;
        if status != TransferStatus::InTransit {
            return Err(AppError::InvalidStateTransition(format!(
                "Only in-transit transfers can be received, current status: {}",
                status
            )));
        }

        let lines = self.fetch_lines(transfer_id).await?;
        if input.lines.len() != lines.len()
            || !lines
                .iter()
                .all(|l| input.lines.iter().any(|i| i.transfer_line_id == l.id))
        {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "Receipt must cover every transfer line exactly once".to_string(),
            });
        }

        for receipt in &input.lines {
            let line = lines
                .iter()
                .find(|l| l.id == receipt.transfer_line_id)
                .ok_or_else(|| AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Line {} does not belong to this transfer",
                        receipt.transfer_line_id
                    ),
                })?;

            if receipt.received_qty < Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: "Received quantity cannot be negative".to_string(),
                });
            }
            if receipt.received_qty > line.quantity {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Received ({}) exceeds shipped ({}) for line {}",
                        receipt.received_qty, line.quantity, receipt.transfer_line_id
                    ),
                });
            }
        }

        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE transfers
            SET status = $1, received_by = $2, received_at = NOW(),
                notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $4 AND tenant_id = $5 AND status = $6
            "#,
        )
        .bind(TransferStatus::Received.as_str())
        .bind(actor_id)
        .bind(&input.notes)
        .bind(transfer_id)
        .bind(tenant_id)
        .bind(TransferStatus::InTransit.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "Transfer status changed concurrently".to_string(),
            ));
        }

        for receipt in &input.lines {
            sqlx::query(
                r#"
                UPDATE transfer_lines
                SET received_qty = $1, notes = COALESCE($2, notes)
                WHERE id = $3 AND transfer_id = $4
                "#,
            )
            .bind(receipt.received_qty)
            .bind(&receipt.notes)
            .bind(receipt.transfer_line_id)
            .bind(transfer_id)
            .execute(&mut *tx)
            .await?;
        }

        for receipt in input
            .lines
            .iter()
            .filter(|r| r.received_qty > Decimal::ZERO)
        {
            let line = lines
                .iter()
                .find(|l| l.id == receipt.transfer_line_id)
                .ok_or_else(|| AppError::Internal("Transfer line disappeared".to_string()))?;

            InventoryService::increase(
                &mut tx,
                tenant_id,
                line.item_id,
                row.to_location_id,
                receipt.received_qty,
                line.unit_cost,
                TransactionType::TransferIn,
                TransactionReference::Transfer(transfer_id),
                actor_id,
                receipt.notes.as_deref(),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Transfer {} received", row.transfer_number);

        self.get(tenant_id, transfer_id).await
    }

    /// Get a transfer with its lines
    pub async fn get(&self, tenant_id: Uuid, transfer_id: Uuid) -> AppResult<Transfer> {
        let row = self.fetch(tenant_id, transfer_id).await?;
        let lines = self.fetch_lines(transfer_id).await?;
        build_transfer(row, lines)
    }

    /// List transfers, newest first, optionally filtered by status
    pub async fn list(
        &self,
        tenant_id: Uuid,
        status: Option<TransferStatus>,
    ) -> AppResult<Vec<Transfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT id, transfer_number, status, from_location_id, to_location_id,
                   estimated_value, notes, created_by, approved_by, approved_at,
                   fulfilled_by, fulfilled_at, received_by, received_at, created_at, updated_at
            FROM transfers
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        let mut transfers = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.fetch_lines(row.id).await?;
            transfers.push(build_transfer(row, lines)?);
        }
        Ok(transfers)
    }

    async fn fetch(&self, tenant_id: Uuid, transfer_id: Uuid) -> AppResult<TransferRow> {
        sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT id, transfer_number, status, from_location_id, to_location_id,
                   estimated_value, notes, created_by, approved_by, approved_at,
                   fulfilled_by, fulfilled_at, received_by, received_at, created_at, updated_at
            FROM transfers
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(transfer_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))
    }

    async fn fetch_lines(&self, transfer_id: Uuid) -> AppResult<Vec<TransferLine>> {
        let lines = sqlx::query_as::<_, TransferLine>(
            r#"
            SELECT id, item_id, quantity, received_qty, unit_cost, notes
            FROM transfer_lines
            WHERE transfer_id = $1
            ORDER BY id
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&self.db)
        .await?;
        Ok(lines)
    }
}

fn build_transfer(row: TransferRow, lines: Vec<TransferLine>) -> AppResult<Transfer> {
    let status = parse_status(&row.status)?;
    Ok(Transfer {
        id: row.id,
        transfer_number: row.transfer_number,
        status,
        from_location_id: row.from_location_id,
        to_location_id: row.to_location_id,
        estimated_value: row.estimated_value,
        notes: row.notes,
        created_by: row.created_by,
        approved_by: row.approved_by,
        approved_at: row.approved_at,
        fulfilled_by: row.fulfilled_by,
        fulfilled_at: row.fulfilled_at,
        received_by: row.received_by,
        received_at: row.received_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        lines,
    })
}
