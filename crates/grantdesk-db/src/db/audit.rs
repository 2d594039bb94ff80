use grantdesk_core::models::{AuditAction, AuditFilter, AuditLog, UserRole};
use grantdesk_core::AppError;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

const AUDIT_COLUMNS: &str =
    "id, actor_id, actor_role, action, entity_type, entity_id, details, created_at";

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

/// One audit record to append.
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<UserRole>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: serde_json::Value,
}

#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a record outside any transaction. Failures are logged but do
    /// not fail the caller: audit logging never blocks the operation itself.
    pub async fn append(&self, entry: &NewAuditLog) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_id, actor_role, action, entity_type, entity_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.actor_role)
        .bind(entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!(action = ?entry.action, "Failed to append audit log: {}", e);
        }
    }

    /// Append a record inside the caller's transaction, so the record commits
    /// or rolls back together with the mutation it describes.
    pub async fn append_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: &NewAuditLog,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_id, actor_role, action, entity_type, entity_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.actor_role)
        .bind(entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Query the log with optional filters, newest first.
    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, AppError> {
        let mut builder = build_audit_query(filter);

        let logs = builder
            .build_query_as::<AuditLog>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query audit logs: {}", e);
                AppError::Internal("Failed to query audit logs".to_string())
            })?;

        Ok(logs)
    }
}

fn build_audit_query(filter: &AuditFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE 1=1",
    ));

    if let Some(actor_id) = filter.actor_id {
        builder.push(" AND actor_id = ").push_bind(actor_id);
    }
    if let Some(action) = filter.action {
        builder.push(" AND action = ").push_bind(action);
    }
    if let Some(entity_type) = &filter.entity_type {
        builder.push(" AND entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(from) = filter.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND created_at <= ").push_bind(to);
    }

    let limit = filter
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    builder.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);

    if let Some(offset) = filter.offset {
        builder.push(" OFFSET ").push_bind(offset.max(0));
    }

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_query_applies_default_limit() {
        let builder = build_audit_query(&AuditFilter::default());
        let sql = builder.sql();
        assert!(sql.contains("WHERE 1=1 ORDER BY created_at DESC LIMIT $1"));
        assert!(!sql.contains("actor_id ="));
    }

    #[test]
    fn filters_become_bound_predicates() {
        let filter = AuditFilter {
            actor_id: Some(Uuid::new_v4()),
            action: Some(AuditAction::MemberRemoved),
            entity_type: Some("organization".to_string()),
            ..Default::default()
        };
        let builder = build_audit_query(&filter);
        let sql = builder.sql();
        assert!(sql.contains("AND actor_id = $1"));
        assert!(sql.contains("AND action = $2"));
        assert!(sql.contains("AND entity_type = $3"));
        assert!(sql.contains("LIMIT $4"));
    }

    #[test]
    fn oversized_limit_is_clamped() {
        let filter = AuditFilter {
            limit: Some(10_000),
            offset: Some(20),
            ..Default::default()
        };
        let builder = build_audit_query(&filter);
        assert!(builder.sql().contains("OFFSET $2"));
    }
}
