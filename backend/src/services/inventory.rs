//! Inventory ledger service
//!
//! The ledger is the single shared state of all four movement workflows: a
//! position (quantity + weighted average cost) per item and location, plus
//! an append-only transaction log. Every stock mutation in the system goes
//! through `increase` or `decrease`; both run inside a caller-owned
//! database transaction so a workflow's ledger deltas, transaction rows and
//! status change commit together or not at all.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    validate_positive_quantity, validate_unit_cost, PaginatedResponse, Pagination, PaginationMeta,
    TransactionDirection, TransactionReference, TransactionType,
};

/// Inventory service for positions, movements and the transaction log
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Current stock position of one item at one location
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryPosition {
    pub item_id: Uuid,
    pub location_id: Uuid,
    pub quantity: Decimal,
    pub average_cost: Decimal,
}

impl InventoryPosition {
    /// Implicit zero position for (item, location) pairs without a row
    fn zero(item_id: Uuid, location_id: Uuid) -> Self {
        Self {
            item_id,
            location_id,
            quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
        }
    }
}

/// Database row for a ledger transaction
#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    item_id: Uuid,
    location_id: Uuid,
    transaction_type: String,
    direction: String,
    quantity: Decimal,
    unit_cost: Option<Decimal>,
    reference_type: String,
    reference_id: Option<Uuid>,
    notes: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

/// One immutable ledger fact
#[derive(Debug, Clone, Serialize)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub item_id: Uuid,
    pub location_id: Uuid,
    pub transaction_type: TransactionType,
    pub direction: TransactionDirection,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    #[serde(flatten)]
    pub reference: TransactionReference,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for LedgerTransaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type = TransactionType::parse(&row.transaction_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown transaction type: {}", row.transaction_type))
        })?;
        let direction = TransactionDirection::parse(&row.direction).ok_or_else(|| {
            AppError::Internal(format!("Unknown transaction direction: {}", row.direction))
        })?;
        let reference = TransactionReference::from_parts(&row.reference_type, row.reference_id)
            .ok_or_else(|| {
                AppError::Internal(format!("Invalid transaction reference: {}", row.reference_type))
            })?;

        Ok(LedgerTransaction {
            id: row.id,
            item_id: row.item_id,
            location_id: row.location_id,
            transaction_type,
            direction,
            quantity: row.quantity,
            unit_cost: row.unit_cost,
            reference,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// Filters for transaction history queries
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// Input for a manual stock adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustStockInput {
    pub item_id: Uuid,
    pub location_id: Uuid,
    pub direction: TransactionDirection,
    pub quantity: Decimal,
    /// Required for inbound adjustments, ignored for outbound
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
}

/// Stock value aggregated per location
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LocationValuation {
    pub location_id: Uuid,
    pub location_name: String,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}

/// Stock value aggregated per item category
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryValuation {
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Movement primitives (caller-owned transaction)
    // ========================================================================

    /// Add stock to a position and append the matching ledger transaction.
    ///
    /// Upserts the position in a single statement; the weighted average
    /// cost is recomputed in SQL from the current row, so concurrent
    /// movements on the same position serialize on the row lock.
    pub async fn increase(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: Uuid,
        item_id: Uuid,
        location_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        transaction_type: TransactionType,
        reference: TransactionReference,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> AppResult<()> {
        validate_positive_quantity(quantity)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_unit_cost(unit_cost).map_err(|e| AppError::ValidationError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO inventory_positions (tenant_id, item_id, location_id, quantity, average_cost)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id, item_id, location_id) DO UPDATE
            SET quantity = inventory_positions.quantity + EXCLUDED.quantity,
                average_cost = CASE
                    WHEN inventory_positions.quantity + EXCLUDED.quantity > 0 THEN
                        (inventory_positions.quantity * inventory_positions.average_cost
                         + EXCLUDED.quantity * EXCLUDED.average_cost)
                        / (inventory_positions.quantity + EXCLUDED.quantity)
                    ELSE EXCLUDED.average_cost
                END,
                updated_at = NOW()
            "#,
        )
        .bind(tenant_id)
        .bind(item_id)
        .bind(location_id)
        .bind(quantity)
        .bind(unit_cost)
        .execute(&mut **tx)
        .await?;

        Self::append_transaction(
            tx,
            tenant_id,
            item_id,
            location_id,
            transaction_type,
            TransactionDirection::In,
            quantity,
            Some(unit_cost),
            reference,
            actor_id,
            notes,
        )
        .await
    }

    /// Remove stock from a position and append the matching ledger
    /// transaction. The average cost is left unchanged.
    ///
    /// The update is guarded on the current quantity: two concurrent
    /// decreases on the same position serialize on the row lock and the
    /// second fails with `InsufficientStock` instead of overdrawing.
    pub async fn decrease(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: Uuid,
        item_id: Uuid,
        location_id: Uuid,
        quantity: Decimal,
        transaction_type: TransactionType,
        reference: TransactionReference,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> AppResult<()> {
        validate_positive_quantity(quantity)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE inventory_positions
            SET quantity = quantity - $4, updated_at = NOW()
            WHERE tenant_id = $1 AND item_id = $2 AND location_id = $3 AND quantity >= $4
            "#,
        )
        .bind(tenant_id)
        .bind(item_id)
        .bind(location_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let available = sqlx::query_scalar::<_, Decimal>(
                "SELECT quantity FROM inventory_positions WHERE tenant_id = $1 AND item_id = $2 AND location_id = $3",
            )
            .bind(tenant_id)
            .bind(item_id)
            .bind(location_id)
            .fetch_optional(&mut **tx)
            .await?
            .unwrap_or(Decimal::ZERO);

            return Err(AppError::InsufficientStock(format!(
                "Available ({}) is less than requested ({}) for item {} at location {}",
                available, quantity, item_id, location_id
            )));
        }

        Self::append_transaction(
            tx,
            tenant_id,
            item_id,
            location_id,
            transaction_type,
            TransactionDirection::Out,
            quantity,
            None,
            reference,
            actor_id,
            notes,
        )
        .await
    }

    /// Append one row to the immutable transaction log
    #[allow(clippy::too_many_arguments)]
    async fn append_transaction(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: Uuid,
        item_id: Uuid,
        location_id: Uuid,
        transaction_type: TransactionType,
        direction: TransactionDirection,
        quantity: Decimal,
        unit_cost: Option<Decimal>,
        reference: TransactionReference,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_transactions
                (tenant_id, item_id, location_id, transaction_type, direction, quantity, unit_cost,
                 reference_type, reference_id, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(tenant_id)
        .bind(item_id)
        .bind(location_id)
        .bind(transaction_type.as_str())
        .bind(direction.as_str())
        .bind(quantity)
        .bind(unit_cost)
        .bind(reference.kind())
        .bind(reference.entity_id())
        .bind(notes)
        .bind(actor_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get the position of an item at a location.
    ///
    /// A missing row is an implicit zero position, not an error.
    pub async fn get_position(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<InventoryPosition> {
        let position = sqlx::query_as::<_, InventoryPosition>(
            r#"
            SELECT item_id, location_id, quantity, average_cost
            FROM inventory_positions
            WHERE tenant_id = $1 AND item_id = $2 AND location_id = $3
            "#,
        )
        .bind(tenant_id)
        .bind(item_id)
        .bind(location_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(position.unwrap_or_else(|| InventoryPosition::zero(item_id, location_id)))
    }

    /// List positions, optionally filtered by item and/or location
    pub async fn list_positions(
        &self,
        tenant_id: Uuid,
        item_id: Option<Uuid>,
        location_id: Option<Uuid>,
    ) -> AppResult<Vec<InventoryPosition>> {
        let positions = sqlx::query_as::<_, InventoryPosition>(
            r#"
            SELECT item_id, location_id, quantity, average_cost
            FROM inventory_positions
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR location_id = $3)
            ORDER BY item_id, location_id
            "#,
        )
        .bind(tenant_id)
        .bind(item_id)
        .bind(location_id)
        .fetch_all(&self.db)
        .await?;

        Ok(positions)
    }

    /// Total on-hand quantity of an item across all locations
    pub async fn total_quantity(&self, tenant_id: Uuid, item_id: Uuid) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT SUM(quantity) FROM inventory_positions WHERE tenant_id = $1 AND item_id = $2",
        )
        .bind(tenant_id)
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    /// Transaction history, newest first, with optional filters
    pub async fn list_transactions(
        &self,
        tenant_id: Uuid,
        filter: TransactionFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<LedgerTransaction>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM inventory_transactions
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR location_id = $3)
              AND ($4::text IS NULL OR transaction_type = $4)
              AND ($5::date IS NULL OR created_at::date >= $5)
              AND ($6::date IS NULL OR created_at::date <= $6)
            "#,
        )
        .bind(tenant_id)
        .bind(filter.item_id)
        .bind(filter.location_id)
        .bind(filter.transaction_type.map(|t| t.as_str()))
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, item_id, location_id, transaction_type, direction, quantity, unit_cost,
                   reference_type, reference_id, notes, created_by, created_at
            FROM inventory_transactions
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR item_id = $2)
              AND ($3::uuid IS NULL OR location_id = $3)
              AND ($4::text IS NULL OR transaction_type = $4)
              AND ($5::date IS NULL OR created_at::date >= $5)
              AND ($6::date IS NULL OR created_at::date <= $6)
            ORDER BY created_at DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(tenant_id)
        .bind(filter.item_id)
        .bind(filter.location_id)
        .bind(filter.transaction_type.map(|t| t.as_str()))
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(LedgerTransaction::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total as u64),
        })
    }

    /// Stock valuation aggregated by location
    pub async fn valuation_by_location(&self, tenant_id: Uuid) -> AppResult<Vec<LocationValuation>> {
        let rows = sqlx::query_as::<_, LocationValuation>(
            r#"
            SELECT p.location_id, l.name AS location_name,
                   COALESCE(SUM(p.quantity), 0) AS total_quantity,
                   COALESCE(SUM(p.quantity * p.average_cost), 0) AS total_value
            FROM inventory_positions p
            JOIN locations l ON l.id = p.location_id
            WHERE p.tenant_id = $1
            GROUP BY p.location_id, l.name
            ORDER BY l.name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Stock valuation aggregated by item category
    pub async fn valuation_by_category(&self, tenant_id: Uuid) -> AppResult<Vec<CategoryValuation>> {
        let rows = sqlx::query_as::<_, CategoryValuation>(
            r#"
            SELECT c.id AS category_id, c.name AS category_name,
                   COALESCE(SUM(p.quantity), 0) AS total_quantity,
                   COALESCE(SUM(p.quantity * p.average_cost), 0) AS total_value
            FROM inventory_positions p
            JOIN items i ON i.id = p.item_id
            LEFT JOIN item_categories c ON c.id = i.category_id
            WHERE p.tenant_id = $1
            GROUP BY c.id, c.name
            ORDER BY c.name NULLS LAST
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    // ========================================================================
    // Manual adjustments
    // ========================================================================

    /// Record a manual stock adjustment and return the updated position
    pub async fn adjust(
        &self,
        tenant_id: Uuid,
        actor_id: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<InventoryPosition> {
        let mut tx = self.db.begin().await?;

        match input.direction {
            TransactionDirection::In => {
                let unit_cost = input.unit_cost.ok_or_else(|| AppError::Validation {
                    field: "unit_cost".to_string(),
                    message: "Unit cost is required for inbound adjustments".to_string(),
                })?;
                Self::increase(
                    &mut tx,
                    tenant_id,
                    input.item_id,
                    input.location_id,
                    input.quantity,
                    unit_cost,
                    TransactionType::Adjustment,
                    TransactionReference::Adjustment,
                    actor_id,
                    input.notes.as_deref(),
                )
                .await?;
            }
            TransactionDirection::Out => {
                Self::decrease(
                    &mut tx,
                    tenant_id,
                    input.item_id,
                    input.location_id,
                    input.quantity,
                    TransactionType::Adjustment,
                    TransactionReference::Adjustment,
                    actor_id,
                    input.notes.as_deref(),
                )
                .await?;
            }
        }

        tx.commit().await?;

        self.get_position(tenant_id, input.item_id, input.location_id)
            .await
    }
}
