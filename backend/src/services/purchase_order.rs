//! Purchase order workflow service
//!
//! Draft → approval → fulfillment state machine for supplier orders. Lines
//! are only mutable while the order is a draft, transitions are forward
//! only, and the receipt statuses (partially received / received) are set
//! exclusively by the receiving workflow's warehouse step.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::catalog::CatalogService;
use crate::services::sequence::next_document_number;
use shared::{
    actor_distinct_from, validate_positive_quantity, validate_unit_cost, ApprovalAction,
    DocumentKind, PurchaseOrderStatus,
};

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
}

/// Database row for a purchase order header
#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    po_number: String,
    supplier_id: Uuid,
    status: String,
    total_amount: Decimal,
    currency: String,
    expected_date: Option<NaiveDate>,
    notes: Option<String>,
    created_by: Uuid,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Purchase order with its lines
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub total_amount: Decimal,
    pub currency: String,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<PurchaseOrderLine>,
}

/// Purchase order line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub line_no: i32,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub received_qty: Decimal,
}

/// Purchase order header without lines, for listings
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderSummary {
    pub id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub total_amount: Decimal,
    pub currency: String,
    pub expected_date: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input line for creating or editing a purchase order
#[derive(Debug, Deserialize)]
pub struct PoLineInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

/// Input for creating a purchase order
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub lines: Vec<PoLineInput>,
    pub currency: Option<String>,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input for editing a draft purchase order. Lines are replaced wholesale.
#[derive(Debug, Deserialize)]
pub struct UpdatePurchaseOrderInput {
    pub supplier_id: Option<Uuid>,
    pub lines: Vec<PoLineInput>,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input for the approval decision
#[derive(Debug, Deserialize)]
pub struct ApprovalInput {
    pub action: ApprovalAction,
    pub reason: Option<String>,
}

fn parse_status(s: &str) -> AppResult<PurchaseOrderStatus> {
    PurchaseOrderStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("Unknown purchase order status: {}", s)))
}

/// Validate order lines and compute the derived total amount
fn validate_lines(lines: &[PoLineInput]) -> AppResult<Decimal> {
    if lines.is_empty() {
        return Err(AppError::Validation {
            field: "lines".to_string(),
            message: "A purchase order requires at least one line".to_string(),
        });
    }
    let mut total = Decimal::ZERO;
    for line in lines {
        validate_positive_quantity(line.quantity).map_err(|e| AppError::Validation {
            field: "lines".to_string(),
            message: e.to_string(),
        })?;
        validate_unit_cost(line.unit_cost).map_err(|e| AppError::Validation {
            field: "lines".to_string(),
            message: e.to_string(),
        })?;
        total += line.quantity * line.unit_cost;
    }
    Ok(total)
}

impl PurchaseOrderService {
    /// Create a new PurchaseOrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a purchase order in draft status
    pub async fn create(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrder> {
        let total_amount = validate_lines(&input.lines)?;

        let catalog = CatalogService::new(self.db.clone());
        catalog.active_supplier(tenant_id, input.supplier_id).await?;
        for line in &input.lines {
            catalog.active_item(tenant_id, line.item_id).await?;
        }

        let currency = input.currency.unwrap_or_else(|| "USD".to_string());

        let mut tx = self.db.begin().await?;

        let po_number = next_document_number(&mut tx, tenant_id, DocumentKind::PurchaseOrder).await?;

        let po_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_orders
                (tenant_id, po_number, supplier_id, status, total_amount, currency, expected_date, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(&po_number)
        .bind(input.supplier_id)
        .bind(PurchaseOrderStatus::Draft.as_str())
        .bind(total_amount)
        .bind(&currency)
        .bind(input.expected_date)
        .bind(&input.notes)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_lines(&mut tx, po_id, &input.lines).await?;

        tx.commit().await?;

        tracing::info!("Purchase order {} created", po_number);

        self.get(tenant_id, po_id).await
    }

    /// Get a purchase order with its lines
    pub async fn get(&self, tenant_id: Uuid, po_id: Uuid) -> AppResult<PurchaseOrder> {
        let row = self.fetch(tenant_id, po_id).await?;
        let lines = sqlx::query_as::<_, PurchaseOrderLine>(
            r#"
            SELECT id, line_no, item_id, quantity, unit_cost, total_cost, received_qty
            FROM purchase_order_lines
            WHERE purchase_order_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(po_id)
        .fetch_all(&self.db)
        .await?;

        let status = parse_status(&row.status)?;
        Ok(PurchaseOrder {
            id: row.id,
            po_number: row.po_number,
            supplier_id: row.supplier_id,
            status,
            total_amount: row.total_amount,
            currency: row.currency,
            expected_date: row.expected_date,
            notes: row.notes,
            created_by: row.created_by,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            lines,
        })
    }

    /// List purchase orders, newest first, optionally filtered by status
    pub async fn list(
        &self,
        tenant_id: Uuid,
        status: Option<PurchaseOrderStatus>,
    ) -> AppResult<Vec<PurchaseOrderSummary>> {
        let rows = sqlx::query_as::<_, PurchaseOrderRow>(
            r#"
            SELECT id, po_number, supplier_id, status, total_amount, currency, expected_date,
                   notes, created_by, approved_by, approved_at, created_at, updated_at
            FROM purchase_orders
            WHERE tenant_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PurchaseOrderSummary {
                    id: row.id,
                    po_number: row.po_number,
                    supplier_id: row.supplier_id,
                    status: parse_status(&row.status)?,
                    total_amount: row.total_amount,
                    currency: row.currency,
                    expected_date: row.expected_date,
                    created_by: row.created_by,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    /// Edit a draft purchase order, replacing its lines wholesale
    pub async fn update_draft(
        &self,
        tenant_id: Uuid,
        po_id: Uuid,
        input: UpdatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrder> {
        let row = self.fetch(tenant_id, po_id).await?;
        let status = parse_status(&row.status)?;
        if status != PurchaseOrderStatus::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Only draft purchase orders can be edited, current status: {}",
                status
            )));
        }

        let total_amount = validate_lines(&input.lines)?;

        let catalog = CatalogService::new(self.db.clone());
        let supplier_id = input.supplier_id.unwrap_or(row.supplier_id);
        catalog.active_supplier(tenant_id, supplier_id).await?;
        for line in &input.lines {
            catalog.active_item(tenant_id, line.item_id).await?;
        }

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE purchase_orders
            SET supplier_id = $1, total_amount = $2, expected_date = $3,
                notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $5 AND tenant_id = $6 AND status = $7
            "#,
        )
        .bind(supplier_id)
        .bind(total_amount)
        .bind(input.expected_date.or(row.expected_date))
        .bind(&input.notes)
        .bind(po_id)
        .bind(tenant_id)
        .bind(PurchaseOrderStatus::Draft.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM purchase_order_lines WHERE purchase_order_id = $1")
            .bind(po_id)
            .execute(&mut *tx)
            .await?;

        insert_lines(&mut tx, po_id, &input.lines).await?;

        tx.commit().await?;

        self.get(tenant_id, po_id).await
    }

    /// Submit a draft purchase order for approval
    pub async fn submit(&self, tenant_id: Uuid, po_id: Uuid) -> AppResult<PurchaseOrder> {
        let row = self.fetch(tenant_id, po_id).await?;
        let status = parse_status(&row.status)?;
        if status != PurchaseOrderStatus::Draft {
            return Err(AppError::InvalidStateTransition(format!(
                "Only draft purchase orders can be submitted, current status: {}",
                status
            )));
        }

        let line_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchase_order_lines WHERE purchase_order_id = $1",
        )
        .bind(po_id)
        .fetch_one(&self.db)
        .await?;
        if line_count == 0 {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "A purchase order without lines cannot be submitted".to_string(),
            });
        }

        self.transition(tenant_id, po_id, status, PurchaseOrderStatus::PendingApproval)
            .await?;

        self.get(tenant_id, po_id).await
    }

    /// Approve or reject a submitted purchase order.
    ///
    /// The approver must not be the creator.
    pub async fn approve(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        po_id: Uuid,
        input: ApprovalInput,
    ) -> AppResult<PurchaseOrder> {
        let row = self.fetch(tenant_id, po_id).await?;
        let status = parse_status(&row.status)?;
        if status != PurchaseOrderStatus::PendingApproval {
            return Err(AppError::InvalidStateTransition(format!(
                "Only purchase orders pending approval can be decided, current status: {}",
                status
            )));
        }

        if !actor_distinct_from(actor_id, &[row.created_by]) {
            return Err(AppError::Forbidden(
                "You cannot approve your own purchase order".to_string(),
            ));
        }

        match input.action {
            ApprovalAction::Approve => {
                let result = sqlx::query(
                    r#"
                    UPDATE purchase_orders
                    SET status = $1, approved_by = $2, approved_at = NOW(), updated_at = NOW()
                    WHERE id = $3 AND tenant_id = $4 AND status = $5
                    "#,
                )
                .bind(PurchaseOrderStatus::Approved.as_str())
                .bind(actor_id)
                .bind(po_id)
                .bind(tenant_id)
                .bind(PurchaseOrderStatus::PendingApproval.as_str())
                .execute(&self.db)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::InvalidStateTransition(
                        "Purchase order status changed concurrently".to_string(),
                    ));
                }

                tracing::info!("Purchase order {} approved", row.po_number);
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
                    UPDATE purchase_orders
                    SET status = $1, notes = NULLIF($2, ''), updated_at = NOW()
                    WHERE id = $3 AND tenant_id = $4 AND status = $5
                    "#,
                )
                .bind(PurchaseOrderStatus::Cancelled.as_str())
                .bind(&notes)
                .bind(po_id)
                .bind(tenant_id)
                .bind(PurchaseOrderStatus::PendingApproval.as_str())
                .execute(&self.db)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::InvalidStateTransition(
                        "Purchase order status changed concurrently".to_string(),
                    ));
                }

                tracing::info!("Purchase order {} rejected", row.po_number);
            }
        }

        self.get(tenant_id, po_id).await
    }

    /// Mark an approved purchase order as sent to the supplier
    pub async fn mark_sent(&self, tenant_id: Uuid, po_id: Uuid) -> AppResult<PurchaseOrder> {
        let row = self.fetch(tenant_id, po_id).await?;
        let status = parse_status(&row.status)?;
        if status != PurchaseOrderStatus::Approved {
            return Err(AppError::InvalidStateTransition(format!(
                "Only approved purchase orders can be marked as sent, current status: {}",
                status
            )));
        }

        self.transition(tenant_id, po_id, status, PurchaseOrderStatus::Sent)
            .await?;

        self.get(tenant_id, po_id).await
    }

    /// Fetch a purchase order header, tenant-scoped
    async fn fetch(&self, tenant_id: Uuid, po_id: Uuid) -> AppResult<PurchaseOrderRow> {
        sqlx::query_as::<_, PurchaseOrderRow>(
            r#"
            SELECT id, po_number, supplier_id, status, total_amount, currency, expected_date,
                   notes, created_by, approved_by, approved_at, created_at, updated_at
            FROM purchase_orders
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(po_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
    }

    /// Guarded status transition; fails if the row moved concurrently
    async fn transition(
        &self,
        tenant_id: Uuid,
        po_id: Uuid,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE purchase_orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3 AND status = $4
            "#,
        )
        .bind(to.as_str())
        .bind(po_id)
        .bind(tenant_id)
        .bind(from.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "Purchase order status changed concurrently".to_string(),
            ));
        }
        Ok(())
    }
}

/// Insert order lines with derived totals, numbered in input order
async fn insert_lines(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    po_id: Uuid,
    lines: &[PoLineInput],
) -> AppResult<()> {
    for (idx, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO purchase_order_lines
                (purchase_order_id, line_no, item_id, quantity, unit_cost, total_cost)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(po_id)
        .bind((idx + 1) as i32)
        .bind(line.item_id)
        .bind(line.quantity)
        .bind(line.unit_cost)
        .bind(line.quantity * line.unit_cost)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
