//! Catalog lookups
//!
//! Items, locations and suppliers are owned by the catalog CRUD surface,
//! which is a separate collaborator. The workflows only need tenant-scoped
//! existence and active-flag checks, which is all this service exposes.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Read-only catalog access for the workflow services
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Item master reference
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ItemRef {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub unit: String,
    pub is_active: bool,
}

/// Location master reference
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LocationRef {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
}

/// Supplier master reference
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupplierRef {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get an item in the tenant's catalog
    pub async fn get_item(&self, tenant_id: Uuid, item_id: Uuid) -> AppResult<ItemRef> {
        sqlx::query_as::<_, ItemRef>(
            "SELECT id, sku, name, category_id, unit, is_active FROM items WHERE id = $1 AND tenant_id = $2",
        )
        .bind(item_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))
    }

    /// Get an item and require it to be active
    pub async fn active_item(&self, tenant_id: Uuid, item_id: Uuid) -> AppResult<ItemRef> {
        let item = self.get_item(tenant_id, item_id).await?;
        if !item.is_active {
            return Err(AppError::Validation {
                field: "item_id".to_string(),
                message: format!("Item {} is not active", item.sku),
            });
        }
        Ok(item)
    }

    /// Get a location in the tenant's catalog
    pub async fn get_location(&self, tenant_id: Uuid, location_id: Uuid) -> AppResult<LocationRef> {
        sqlx::query_as::<_, LocationRef>(
            "SELECT id, name, parent_id, is_active FROM locations WHERE id = $1 AND tenant_id = $2",
        )
        .bind(location_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Location".to_string()))
    }

    /// Get a location and require it to be active
    pub async fn active_location(&self, tenant_id: Uuid, location_id: Uuid) -> AppResult<LocationRef> {
        let location = self.get_location(tenant_id, location_id).await?;
        if !location.is_active {
            return Err(AppError::Validation {
                field: "location_id".to_string(),
                message: format!("Location {} is not active", location.name),
            });
        }
        Ok(location)
    }

    /// Get a supplier in the tenant's catalog
    pub async fn get_supplier(&self, tenant_id: Uuid, supplier_id: Uuid) -> AppResult<SupplierRef> {
        sqlx::query_as::<_, SupplierRef>(
            "SELECT id, name, is_active FROM suppliers WHERE id = $1 AND tenant_id = $2",
        )
        .bind(supplier_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// Get a supplier and require it to be active
    pub async fn active_supplier(&self, tenant_id: Uuid, supplier_id: Uuid) -> AppResult<SupplierRef> {
        let supplier = self.get_supplier(tenant_id, supplier_id).await?;
        if !supplier.is_active {
            return Err(AppError::Validation {
                field: "supplier_id".to_string(),
                message: format!("Supplier {} is not active", supplier.name),
            });
        }
        Ok(supplier)
    }
}
