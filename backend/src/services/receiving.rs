//! Receiving workflow service
//!
//! Three-stage inspection pipeline for goods arriving against a purchase
//! order: procurement verifies the delivery, quality control splits each
//! line into accepted and rejected units, and the warehouse books the
//! accepted stock. Each stage must be performed by a different actor, and
//! the warehouse step is the only path by which purchase-order stock enters
//! the inventory ledger.

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
    actor_distinct_from, derive_receipt_status, validate_positive_quantity, validate_qc_line,
    validate_qc_result, DocumentKind, LineReceipt, PurchaseOrderStatus, QcResult, ReceivingStatus,
    TransactionReference, TransactionType,
};

/// Receiving service
#[derive(Clone)]
pub struct ReceivingService {
    db: PgPool,
}

/// Database row for a receiving header
#[derive(Debug, FromRow)]
struct ReceivingRow {
    id: Uuid,
    receiving_number: String,
    purchase_order_id: Uuid,
    status: String,
    proc_verified_by: Uuid,
    proc_verified_at: DateTime<Utc>,
    qc_inspected_by: Option<Uuid>,
    qc_inspected_at: Option<DateTime<Utc>>,
    qc_result: Option<String>,
    warehouse_received_by: Option<Uuid>,
    warehouse_received_at: Option<DateTime<Utc>>,
    location_id: Option<Uuid>,
    batch_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Receiving record with its lines
#[derive(Debug, Clone, Serialize)]
pub struct Receiving {
    pub id: Uuid,
    pub receiving_number: String,
    pub purchase_order_id: Uuid,
    pub status: ReceivingStatus,
    pub proc_verified_by: Uuid,
    pub proc_verified_at: DateTime<Utc>,
    pub qc_inspected_by: Option<Uuid>,
    pub qc_inspected_at: Option<DateTime<Utc>>,
    pub qc_result: Option<QcResult>,
    pub warehouse_received_by: Option<Uuid>,
    pub warehouse_received_at: Option<DateTime<Utc>>,
    pub location_id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<ReceivingLine>,
}

/// Receiving line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReceivingLine {
    pub id: Uuid,
    pub purchase_order_line_id: Uuid,
    pub item_id: Uuid,
    pub expected_qty: Decimal,
    pub received_qty: Decimal,
    pub accepted_qty: Decimal,
    pub rejected_qty: Decimal,
    pub unit_cost: Decimal,
    pub notes: Option<String>,
}

/// Input line for procurement verification
#[derive(Debug, Deserialize)]
pub struct VerifyLineInput {
    pub purchase_order_line_id: Uuid,
    pub received_qty: Decimal,
    pub notes: Option<String>,
}

/// Input for creating a receiving record (procurement verification)
#[derive(Debug, Deserialize)]
pub struct CreateReceivingInput {
    pub purchase_order_id: Uuid,
    pub lines: Vec<VerifyLineInput>,
    pub notes: Option<String>,
}

/// Input line for the QC inspection
#[derive(Debug, Deserialize)]
pub struct QcLineInput {
    pub receiving_line_id: Uuid,
    pub accepted_qty: Decimal,
    pub rejected_qty: Decimal,
    pub notes: Option<String>,
}

/// Input for the QC inspection step
#[derive(Debug, Deserialize)]
pub struct QcInspectInput {
    pub lines: Vec<QcLineInput>,
    pub qc_result: QcResult,
    pub notes: Option<String>,
}

/// Input for the warehouse receipt step
#[derive(Debug, Deserialize)]
pub struct WarehouseReceiveInput {
    pub location_id: Uuid,
    pub batch_number: Option<String>,
    pub notes: Option<String>,
}

fn parse_status(s: &str) -> AppResult<ReceivingStatus> {
    ReceivingStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("Unknown receiving status: {}", s)))
}

impl ReceivingService {
    /// Create a new ReceivingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Stage 1: procurement verifies the delivery and creates the
    /// receiving record.
    ///
    /// The purchase order must be approved or sent, and the verifier must
    /// not be the order's creator.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        input: CreateReceivingInput,
    ) -> AppResult<Receiving> {
        let po = sqlx::query_as::<_, (String, Uuid, String)>(
            "SELECT status, created_by, po_number FROM purchase_orders WHERE id = $1 AND tenant_id = $2",
        )
        .bind(input.purchase_order_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let po_status = PurchaseOrderStatus::parse(&po.0)
            .ok_or_else(|| AppError::Internal(format!("Unknown purchase order status: {}", po.0)))?;
        if !matches!(
            po_status,
            PurchaseOrderStatus::Approved | PurchaseOrderStatus::Sent
        ) {
            return Err(AppError::InvalidStateTransition(format!(
                "Deliveries can only be verified for approved or sent purchase orders, current status: {}",
                po_status
            )));
        }

        if !actor_distinct_from(actor_id, &[po.1]) {
            return Err(AppError::Forbidden(
                "The purchase order creator cannot verify its own delivery".to_string(),
            ));
        }

        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "A delivery verification requires at least one line".to_string(),
            });
        }

        // Ordered quantity and cost per purchase order line
        let po_lines = sqlx::query_as::<_, (Uuid, Uuid, Decimal, Decimal)>(
            "SELECT id, item_id, quantity, unit_cost FROM purchase_order_lines WHERE purchase_order_id = $1",
        )
        .bind(input.purchase_order_id)
        .fetch_all(&self.db)
        .await?;

        let mut verified = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let po_line = po_lines
                .iter()
                .find(|(id, _, _, _)| *id == line.purchase_order_line_id)
                .ok_or_else(|| AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Line {} does not belong to purchase order {}",
                        line.purchase_order_line_id, po.2
                    ),
                })?;

            validate_positive_quantity(line.received_qty).map_err(|e| AppError::Validation {
                field: "lines".to_string(),
                message: e.to_string(),
            })?;
            if line.received_qty > po_line.2 {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Received ({}) exceeds the ordered quantity ({}) for line {}",
                        line.received_qty, po_line.2, line.purchase_order_line_id
                    ),
                });
            }

            verified.push((line, po_line.1, po_line.2, po_line.3));
        }

        let mut tx = self.db.begin().await?;

        let receiving_number =
            next_document_number(&mut tx, tenant_id, DocumentKind::Receiving).await?;

        let receiving_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO receivings
                (tenant_id, receiving_number, purchase_order_id, status,
                 proc_verified_by, proc_verified_at, notes)
            VALUES ($1, $2, $3, $4, $5, NOW(), $6)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(&receiving_number)
        .bind(input.purchase_order_id)
        .bind(ReceivingStatus::ProcVerified.as_str())
        .bind(actor_id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        for (line, item_id, expected_qty, unit_cost) in &verified {
            sqlx::query(
                r#"
                INSERT INTO receiving_lines
                    (receiving_id, purchase_order_line_id, item_id, expected_qty, received_qty,
                     accepted_qty, rejected_qty, unit_cost, notes)
                VALUES ($1, $2, $3, $4, $5, 0, 0, $6, $7)
                "#,
            )
            .bind(receiving_id)
            .bind(line.purchase_order_line_id)
            .bind(item_id)
            .bind(expected_qty)
            .bind(line.received_qty)
            .bind(unit_cost)
            .bind(&line.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Receiving {} created", receiving_number);

        self.get(tenant_id, receiving_id).await
    }

    /// Stage 2: quality control splits each counted line into accepted and
    /// rejected units.
    ///
    /// The inspector must differ from the procurement verifier, and every
    /// line must balance: accepted + rejected == received.
    pub async fn qc_inspect(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        receiving_id: Uuid,
        input: QcInspectInput,
    ) -> AppResult<Receiving> {
        let row = self.fetch(tenant_id, receiving_id).await?;
        let status = parse_status(&row.status)?;
        if status != ReceivingStatus::ProcVerified {
            return Err(AppError::InvalidStateTransition(format!(
                "QC inspection requires a verified receiving, current status: {}",
                status
            )));
        }

        if !actor_distinct_from(actor_id, &[row.proc_verified_by]) {
            return Err(AppError::Forbidden(
                "The procurement verifier cannot perform the QC inspection".to_string(),
            ));
        }

        let lines = self.fetch_lines(receiving_id).await?;

        // Every counted line needs a verdict
        if input.lines.len() != lines.len()
            || !lines
                .iter()
                .all(|l| input.lines.iter().any(|i| i.receiving_line_id == l.id))
        {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "QC inspection must cover every receiving line exactly once".to_string(),
            });
        }

        let mut total_accepted = Decimal::ZERO;
        for qc in &input.lines {
            let line = lines
                .iter()
                .find(|l| l.id == qc.receiving_line_id)
                .ok_or_else(|| AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Line {} does not belong to this receiving",
                        qc.receiving_line_id
                    ),
                })?;

            validate_qc_line(line.received_qty, qc.accepted_qty, qc.rejected_qty).map_err(
                |message| AppError::Validation {
                    field: "lines".to_string(),
                    message,
                },
            )?;
            total_accepted += qc.accepted_qty;
        }

        validate_qc_result(input.qc_result, total_accepted).map_err(|e| AppError::Validation {
            field: "qc_result".to_string(),
            message: e.to_string(),
        })?;

        let outcome = if input.qc_result == QcResult::Rejected {
            ReceivingStatus::QcRejected
        } else {
            ReceivingStatus::QcApproved
        };

        let mut tx = self.db.begin().await?;

        for qc in &input.lines {
            sqlx::query(
                r#"
                UPDATE receiving_lines
                SET accepted_qty = $1, rejected_qty = $2, notes = COALESCE($3, notes)
                WHERE id = $4 AND receiving_id = $5
                "#,
            )
            .bind(qc.accepted_qty)
            .bind(qc.rejected_qty)
            .bind(&qc.notes)
            .bind(qc.receiving_line_id)
            .bind(receiving_id)
            .execute(&mut *tx)
            .await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE receivings
            SET status = $1, qc_inspected_by = $2, qc_inspected_at = NOW(), qc_result = $3,
                notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $5 AND tenant_id = $6 AND status = $7
            "#,
        )
        .bind(outcome.as_str())
        .bind(actor_id)
        .bind(input.qc_result.as_str())
        .bind(&input.notes)
        .bind(receiving_id)
        .bind(tenant_id)
        .bind(ReceivingStatus::ProcVerified.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "Receiving status changed concurrently".to_string(),
            ));
        }

        tx.commit().await?;

        tracing::info!(
            "Receiving {} inspected: {}",
            row.receiving_number,
            input.qc_result
        );

        self.get(tenant_id, receiving_id).await
    }

    /// Stage 3: the warehouse books accepted stock into the ledger.
    ///
    /// Requires a QC-approved receiving and an actor distinct from both the
    /// verifier and the inspector. All ledger increases, purchase-order
    /// line updates and status changes commit in one transaction; rejected
    /// quantities never touch inventory.
    pub async fn warehouse_receive(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        receiving_id: Uuid,
        input: WarehouseReceiveInput,
    ) -> AppResult<Receiving> {
        let row = self.fetch(tenant_id, receiving_id).await?;
        let status = parse_status(&row.status)?;
        if status != ReceivingStatus::QcApproved {
            return Err(AppError::InvalidStateTransition(format!(
                "Warehouse receipt requires a QC-approved receiving, current status: {}",
                status
            )));
        }

        let qc_inspected_by = row.qc_inspected_by.ok_or_else(|| {
            AppError::Internal("QC-approved receiving has no inspector recorded".to_string())
        })?;
        if !actor_distinct_from(actor_id, &[row.proc_verified_by, qc_inspected_by]) {
            return Err(AppError::Forbidden(
                "Warehouse receipt requires an actor distinct from the verifier and the inspector"
                    .to_string(),
            ));
        }

        let catalog = CatalogService::new(self.db.clone());
        catalog.active_location(tenant_id, input.location_id).await?;

        let mut tx = self.db.begin().await?;

        // Flip the receiving first; the guarded update locks the row and
        // makes a concurrent double-receive fail instead of double-booking
        let result = sqlx::query(
            r#"
            UPDATE receivings
            SET status = $1, warehouse_received_by = $2, warehouse_received_at = NOW(),
                location_id = $3, batch_number = $4, notes = COALESCE($5, notes), updated_at = NOW()
            WHERE id = $6 AND tenant_id = $7 AND status = $8
            "#,
        )
        .bind(ReceivingStatus::Received.as_str())
        .bind(actor_id)
        .bind(input.location_id)
        .bind(&input.batch_number)
        .bind(&input.notes)
        .bind(receiving_id)
        .bind(tenant_id)
        .bind(ReceivingStatus::QcApproved.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "Receiving status changed concurrently".to_string(),
            ));
        }

        let lines = sqlx::query_as::<_, ReceivingLine>(
            r#"
            SELECT id, purchase_order_line_id, item_id, expected_qty, received_qty,
                   accepted_qty, rejected_qty, unit_cost, notes
            FROM receiving_lines
            WHERE receiving_id = $1
            "#,
        )
        .bind(receiving_id)
        .fetch_all(&mut *tx)
        .await?;

        for line in lines.iter().filter(|l| l.accepted_qty > Decimal::ZERO) {
            InventoryService::increase(
                &mut tx,
                tenant_id,
                line.item_id,
                input.location_id,
                line.accepted_qty,
                line.unit_cost,
                TransactionType::Inbound,
                TransactionReference::Receiving(receiving_id),
                actor_id,
                input.batch_number.as_deref(),
            )
            .await?;

            let updated = sqlx::query(
                r#"
                UPDATE purchase_order_lines
                SET received_qty = received_qty + $1
                WHERE id = $2 AND received_qty + $1 <= quantity
                "#,
            )
            .bind(line.accepted_qty)
            .bind(line.purchase_order_line_id)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Accepted quantity ({}) exceeds the remaining ordered quantity for purchase order line {}",
                        line.accepted_qty, line.purchase_order_line_id
                    ),
                });
            }
        }

        // Advance the parent purchase order per its line completion
        let receipts = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT quantity, received_qty FROM purchase_order_lines WHERE purchase_order_id = $1",
        )
        .bind(row.purchase_order_id)
        .fetch_all(&mut *tx)
        .await?;

        let receipts: Vec<LineReceipt> = receipts
            .into_iter()
            .map(|(ordered, received)| LineReceipt { ordered, received })
            .collect();

        if let Some(next) = derive_receipt_status(&receipts) {
            let current = sqlx::query_scalar::<_, String>(
                "SELECT status FROM purchase_orders WHERE id = $1 FOR UPDATE",
            )
            .bind(row.purchase_order_id)
            .fetch_one(&mut *tx)
            .await?;
            let current = PurchaseOrderStatus::parse(&current).ok_or_else(|| {
                AppError::Internal(format!("Unknown purchase order status: {}", current))
            })?;

            if current != next && current.can_transition(next) {
                sqlx::query(
                    "UPDATE purchase_orders SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
                )
                .bind(next.as_str())
                .bind(row.purchase_order_id)
                .bind(current.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!("Receiving {} booked into inventory", row.receiving_number);

        self.get(tenant_id, receiving_id).await
    }

    /// Get a receiving record with its lines
    pub async fn get(&self, tenant_id: Uuid, receiving_id: Uuid) -> AppResult<Receiving> {
        let row = self.fetch(tenant_id, receiving_id).await?;
        let lines = self.fetch_lines(receiving_id).await?;
        build_receiving(row, lines)
    }

    /// List receivings, newest first, optionally filtered by status or
    /// purchase order
    pub async fn list(
        &self,
        tenant_id: Uuid,
        status: Option<ReceivingStatus>,
        purchase_order_id: Option<Uuid>,
    ) -> AppResult<Vec<Receiving>> {
        let rows = sqlx::query_as::<_, ReceivingRow>(
            r#"
            SELECT id, receiving_number, purchase_order_id, status,
                   proc_verified_by, proc_verified_at, qc_inspected_by, qc_inspected_at, qc_result,
                   warehouse_received_by, warehouse_received_at, location_id, batch_number,
                   notes, created_at, updated_at
            FROM receivings
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR purchase_order_id = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status.map(|s| s.as_str()))
        .bind(purchase_order_id)
        .fetch_all(&self.db)
        .await?;

        let mut receivings = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.fetch_lines(row.id).await?;
            receivings.push(build_receiving(row, lines)?);
        }
        Ok(receivings)
    }

    /// Fetch a receiving header, tenant-scoped
    async fn fetch(&self, tenant_id: Uuid, receiving_id: Uuid) -> AppResult<ReceivingRow> {
        sqlx::query_as::<_, ReceivingRow>(
            r#"
            SELECT id, receiving_number, purchase_order_id, status,
                   proc_verified_by, proc_verified_at, qc_inspected_by, qc_inspected_at, qc_result,
                   warehouse_received_by, warehouse_received_at, location_id, batch_number,
                   notes, created_at, updated_at
            FROM receivings
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(receiving_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Receiving".to_string()))
    }

    async fn fetch_lines(&self, receiving_id: Uuid) -> AppResult<Vec<ReceivingLine>> {
        let lines = sqlx::query_as::<_, ReceivingLine>(
            r#"
            SELECT id, purchase_order_line_id, item_id, expected_qty, received_qty,
                   accepted_qty, rejected_qty, unit_cost, notes
            FROM receiving_lines
            WHERE receiving_id = $1
            ORDER BY id
            "#,
        )
        .bind(receiving_id)
        .fetch_all(&self.db)
        .await?;
        Ok(lines)
    }
}

fn build_receiving(row: ReceivingRow, lines: Vec<ReceivingLine>) -> AppResult<Receiving> {
    let status = parse_status(&row.status)?;
    let qc_result = match &row.qc_result {
        Some(s) => Some(
            QcResult::parse(s)
                .ok_or_else(|| AppError::Internal(format!("Unknown QC result: {}", s)))?,
        ),
        None => None,
    };

    Ok(Receiving {
        id: row.id,
        receiving_number: row.receiving_number,
        purchase_order_id: row.purchase_order_id,
        status,
        proc_verified_by: row.proc_verified_by,
        proc_verified_at: row.proc_verified_at,
        qc_inspected_by: row.qc_inspected_by,
        qc_inspected_at: row.qc_inspected_at,
        qc_result,
        warehouse_received_by: row.warehouse_received_by,
        warehouse_received_at: row.warehouse_received_at,
        location_id: row.location_id,
        batch_number: row.batch_number,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
        lines,
    })
}
