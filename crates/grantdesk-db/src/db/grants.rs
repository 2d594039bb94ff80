use grantdesk_core::models::Grant;
use grantdesk_core::AppError;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const GRANT_COLUMNS: &str = "id, grant_maker_id, organization_id, title, description, questions, \
     status, reviewers, approvers, deadline, created_at, updated_at";

/// Fields for creating a new grant.
#[derive(Debug, Clone)]
pub struct NewGrant {
    pub grant_maker_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub questions: serde_json::Value,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct GrantRepository {
    pool: PgPool,
}

impl GrantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_grant: &NewGrant) -> Result<Grant, AppError> {
        let grant = sqlx::query_as::<_, Grant>(&format!(
            r#"
            INSERT INTO grants
                (grant_maker_id, organization_id, title, description, questions, status, deadline)
            VALUES ($1, $2, $3, $4, $5, 'draft', $6)
            RETURNING {GRANT_COLUMNS}
            "#,
        ))
        .bind(new_grant.grant_maker_id)
        .bind(new_grant.organization_id)
        .bind(&new_grant.title)
        .bind(&new_grant.description)
        .bind(&new_grant.questions)
        .bind(new_grant.deadline)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create grant: {}", e);
            AppError::Internal("Failed to create grant".to_string())
        })?;

        tracing::info!(grant_id = %grant.id, title = %grant.title, "Created new grant");
        Ok(grant)
    }

    pub async fn get_by_id(&self, grant_id: Uuid) -> Result<Option<Grant>, AppError> {
        let grant = sqlx::query_as::<_, Grant>(&format!(
            "SELECT {GRANT_COLUMNS} FROM grants WHERE id = $1",
        ))
        .bind(grant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch grant: {}", e);
            AppError::Internal("Failed to fetch grant".to_string())
        })?;

        Ok(grant)
    }

    pub async fn list_for_maker(&self, grant_maker_id: Uuid) -> Result<Vec<Grant>, AppError> {
        let grants = sqlx::query_as::<_, Grant>(&format!(
            "SELECT {GRANT_COLUMNS} FROM grants WHERE grant_maker_id = $1 ORDER BY created_at DESC",
        ))
        .bind(grant_maker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list grants for maker: {}", e);
            AppError::Internal("Failed to list grants".to_string())
        })?;

        Ok(grants)
    }

    pub async fn list_published(&self) -> Result<Vec<Grant>, AppError> {
        let grants = sqlx::query_as::<_, Grant>(&format!(
            "SELECT {GRANT_COLUMNS} FROM grants WHERE status = 'published' ORDER BY created_at DESC",
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list published grants: {}", e);
            AppError::Internal("Failed to list grants".to_string())
        })?;

        Ok(grants)
    }

    /// List grants where the user is an assigned reviewer or approver.
    pub async fn list_for_assignee(&self, user_id: Uuid) -> Result<Vec<Grant>, AppError> {
        let grants = sqlx::query_as::<_, Grant>(&format!(
            "SELECT {GRANT_COLUMNS} FROM grants \
             WHERE $1 = ANY(reviewers) OR $1 = ANY(approvers) \
             ORDER BY created_at DESC",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list grants for assignee: {}", e);
            AppError::Internal("Failed to list grants".to_string())
        })?;

        Ok(grants)
    }

    /// Persist mutable grant fields (title, description, questions, status,
    /// assignments, deadline).
    pub async fn update(&self, grant: &Grant) -> Result<Grant, AppError> {
        let updated = sqlx::query_as::<_, Grant>(&format!(
            r#"
            UPDATE grants
            SET title = $2, description = $3, questions = $4, status = $5,
                reviewers = $6, approvers = $7, deadline = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {GRANT_COLUMNS}
            "#,
        ))
        .bind(grant.id)
        .bind(&grant.title)
        .bind(&grant.description)
        .bind(&grant.questions)
        .bind(grant.status)
        .bind(&grant.reviewers)
        .bind(&grant.approvers)
        .bind(grant.deadline)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Grant not found".to_string())
            } else {
                tracing::error!("Failed to update grant: {}", e);
                AppError::Internal("Failed to update grant".to_string())
            }
        })?;

        Ok(updated)
    }

    /// Delete a grant together with its applications. Both deletions run in
    /// the caller's transaction so a crash cannot orphan applications.
    /// Returns the number of cascaded applications.
    pub async fn delete_with_applications(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        grant_id: Uuid,
    ) -> Result<u64, AppError> {
        let applications = sqlx::query("DELETE FROM applications WHERE grant_id = $1")
            .bind(grant_id)
            .execute(&mut **tx)
            .await
            .map_err(AppError::Database)?;

        let result = sqlx::query("DELETE FROM grants WHERE id = $1")
            .bind(grant_id)
            .execute(&mut **tx)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Grant not found".to_string()));
        }

        tracing::info!(grant_id = %grant_id, cascaded = applications.rows_affected(),
            "Deleted grant and its applications");
        Ok(applications.rows_affected())
    }
}
