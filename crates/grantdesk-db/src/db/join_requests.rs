use chrono::{DateTime, Utc};
use grantdesk_core::models::{JoinRequest, JoinRequestStatus};
use grantdesk_core::AppError;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use utoipa::ToSchema;
use uuid::Uuid;

use super::conflict_on_unique;

const REQUEST_COLUMNS: &str = "id, user_id, organization_id, status, created_at, updated_at";

/// A pending join request joined with the requester's name and email, for
/// the admin review queue.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct PendingJoinRequest {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub requester_id: Uuid,
    pub requester_name: String,
    pub requester_email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct JoinRequestRepository {
    pool: PgPool,
}

impl JoinRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending request. A partial unique index guarantees at most
    /// one pending request per user; a concurrent duplicate maps to
    /// `Conflict`.
    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<JoinRequest, AppError> {
        let request = sqlx::query_as::<_, JoinRequest>(&format!(
            r#"
            INSERT INTO join_requests (user_id, organization_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(organization_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| conflict_on_unique(e, "A pending join request already exists"))?;

        tracing::info!(request_id = %request.id, user_id = %user_id, org_id = %organization_id,
            "Created join request");
        Ok(request)
    }

    pub async fn get_by_id(&self, request_id: Uuid) -> Result<Option<JoinRequest>, AppError> {
        let request = sqlx::query_as::<_, JoinRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM join_requests WHERE id = $1",
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch join request: {}", e);
            AppError::Internal("Failed to fetch join request".to_string())
        })?;

        Ok(request)
    }

    pub async fn has_pending_for_user(&self, user_id: Uuid) -> Result<bool, AppError> {
        let exists: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM join_requests WHERE user_id = $1 AND status = 'pending' LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check pending join request: {}", e);
            AppError::Internal("Failed to check pending join request".to_string())
        })?;

        Ok(exists.is_some())
    }

    /// List pending requests for an organization, populated with the
    /// requester's name and email.
    pub async fn list_pending_for_org(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<PendingJoinRequest>, AppError> {
        let requests = sqlx::query_as::<_, PendingJoinRequest>(
            r#"
            SELECT r.id, r.organization_id, u.id AS requester_id,
                   u.name AS requester_name, u.email AS requester_email,
                   r.created_at
            FROM join_requests r
            JOIN users u ON u.id = r.user_id
            WHERE r.organization_id = $1 AND r.status = 'pending'
            ORDER BY r.created_at
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list pending join requests: {}", e);
            AppError::Internal("Failed to list join requests".to_string())
        })?;

        Ok(requests)
    }

    /// Mark the request approved or rejected. Resolved requests are kept so
    /// the history stays auditable.
    pub async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request_id: Uuid,
        status: JoinRequestStatus,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE join_requests SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(request_id)
        .bind(status)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Join request not found".to_string()));
        }
        Ok(())
    }

    /// Remove an orphaned request whose requester no longer exists.
    pub async fn delete(&self, request_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM join_requests WHERE id = $1")
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
