use grantdesk_core::models::{Organization, OrganizationSummary};
use grantdesk_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::conflict_on_unique;

const ORG_COLUMNS: &str = "id, name, admins, members, created_at, updated_at";

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an organization with the creator as sole admin and member.
    /// Fails with `Conflict` if the name is taken (case-sensitive).
    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        creator_id: Uuid,
    ) -> Result<Organization, AppError> {
        let roster = vec![creator_id];
        let org = sqlx::query_as::<_, Organization>(&format!(
            r#"
            INSERT INTO organizations (name, admins, members)
            VALUES ($1, $2, $2)
            RETURNING {ORG_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(&roster)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| conflict_on_unique(e, "An organization with this name already exists"))?;

        tracing::info!(org_id = %org.id, name = %org.name, "Created new organization");
        Ok(org)
    }

    pub async fn get_by_id(&self, org_id: Uuid) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE id = $1",
        ))
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch organization by ID: {}", e);
            AppError::Internal("Failed to fetch organization".to_string())
        })?;

        Ok(org)
    }

    /// Fetch an organization inside a transaction, taking a row lock so the
    /// admin/member rosters cannot change under a concurrent transition.
    pub async fn lock_by_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        org_id: Uuid,
    ) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE id = $1 FOR UPDATE",
        ))
        .bind(org_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(org)
    }

    /// Persist mutated admin/member rosters. Callers hold the row lock from
    /// [`lock_by_id`](Self::lock_by_id) in the same transaction.
    pub async fn update_rosters(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        org_id: Uuid,
        admins: &[Uuid],
        members: &[Uuid],
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET admins = $2, members = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(org_id)
        .bind(admins)
        .bind(members)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Organization not found".to_string()));
        }
        Ok(())
    }

    /// Public listing: id and name for every organization.
    pub async fn list_summaries(&self) -> Result<Vec<OrganizationSummary>, AppError> {
        let orgs = sqlx::query_as::<_, OrganizationSummary>(
            "SELECT id, name FROM organizations ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list organizations: {}", e);
            AppError::Internal("Failed to list organizations".to_string())
        })?;

        Ok(orgs)
    }
}
