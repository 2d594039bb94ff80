use grantdesk_core::models::{Application, ApplicationStatus};
use grantdesk_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::conflict_on_unique;

const APPLICATION_COLUMNS: &str =
    "id, grant_id, applicant_id, grant_maker_id, answers, status, created_at, updated_at";

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a submission. One application per applicant per grant; a
    /// duplicate maps to `Conflict`.
    pub async fn create(
        &self,
        grant_id: Uuid,
        applicant_id: Uuid,
        grant_maker_id: Uuid,
        answers: &serde_json::Value,
    ) -> Result<Application, AppError> {
        let application = sqlx::query_as::<_, Application>(&format!(
            r#"
            INSERT INTO applications (grant_id, applicant_id, grant_maker_id, answers, status)
            VALUES ($1, $2, $3, $4, 'submitted')
            RETURNING {APPLICATION_COLUMNS}
            "#,
        ))
        .bind(grant_id)
        .bind(applicant_id)
        .bind(grant_maker_id)
        .bind(answers)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "An application for this grant already exists"))?;

        tracing::info!(application_id = %application.id, grant_id = %grant_id,
            "Created new application");
        Ok(application)
    }

    pub async fn get_by_id(&self, application_id: Uuid) -> Result<Option<Application>, AppError> {
        let application = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1",
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch application: {}", e);
            AppError::Internal("Failed to fetch application".to_string())
        })?;

        Ok(application)
    }

    pub async fn list_for_applicant(&self, applicant_id: Uuid) -> Result<Vec<Application>, AppError> {
        let applications = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE applicant_id = $1 ORDER BY created_at DESC",
        ))
        .bind(applicant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list applications for applicant: {}", e);
            AppError::Internal("Failed to list applications".to_string())
        })?;

        Ok(applications)
    }

    pub async fn list_for_grant(&self, grant_id: Uuid) -> Result<Vec<Application>, AppError> {
        let applications = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE grant_id = $1 ORDER BY created_at DESC",
        ))
        .bind(grant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list applications for grant: {}", e);
            AppError::Internal("Failed to list applications".to_string())
        })?;

        Ok(applications)
    }

    pub async fn update_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application, AppError> {
        let application = sqlx::query_as::<_, Application>(&format!(
            "UPDATE applications SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {APPLICATION_COLUMNS}",
        ))
        .bind(application_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("Application not found".to_string())
            } else {
                tracing::error!("Failed to update application status: {}", e);
                AppError::Internal("Failed to update application status".to_string())
            }
        })?;

        Ok(application)
    }
}
