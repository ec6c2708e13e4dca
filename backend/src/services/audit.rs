//! Audit trail sink
//!
//! Records who did what to which entity after each successful mutation.
//! Writes are fire-and-forget: a failed audit insert is logged and never
//! blocks or rolls back the business effect it describes.

use sqlx::PgPool;
use uuid::Uuid;

/// Audit service recording workflow mutations
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

/// One auditable fact
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
}

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record an audit fact on a background task
    pub fn record(&self, record: AuditRecord) {
        let db = self.db.clone();
        tokio::spawn(async move {
            let result = sqlx::query(
                r#"
                INSERT INTO audit_logs (tenant_id, user_id, action, entity_type, entity_id, before, after)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(record.tenant_id)
            .bind(record.user_id)
            .bind(&record.action)
            .bind(&record.entity_type)
            .bind(record.entity_id)
            .bind(&record.before)
            .bind(&record.after)
            .execute(&db)
            .await;

            if let Err(e) = result {
                tracing::warn!(
                    "Audit log write failed for {} {}: {}",
                    record.entity_type,
                    record.entity_id,
                    e
                );
            }
        });
    }
}
