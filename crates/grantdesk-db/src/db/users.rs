use grantdesk_core::models::{
    OrgRole, User, UserJoinStatus, UserRole, VerificationStatus,
};
use grantdesk_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::conflict_on_unique;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, organization_id, org_role, \
     join_status, verification_status, profile, created_at, updated_at";

/// Fields for creating a new user account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub organization_id: Option<Uuid>,
    pub org_role: Option<OrgRole>,
    pub verification_status: VerificationStatus,
    pub profile: serde_json::Value,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user. Fails with `Conflict` if the (email, role) pair is
    /// already registered.
    pub async fn create_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new_user: &NewUser,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users
                (name, email, password_hash, role, organization_id, org_role,
                 join_status, verification_status, profile)
            VALUES ($1, $2, $3, $4, $5, $6, 'none', $7, $8)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .bind(new_user.organization_id)
        .bind(new_user.org_role)
        .bind(new_user.verification_status)
        .bind(&new_user.profile)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| conflict_on_unique(e, "An account with this email already exists for this role"))?;

        tracing::info!(user_id = %user.id, role = %user.role, "Created new user");
        Ok(user)
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch user by ID: {}", e);
            AppError::Internal("Failed to fetch user".to_string())
        })?;

        Ok(user)
    }

    /// Fetch a user inside a transaction, taking a row lock so affiliation
    /// guards validated against the row stay true until commit.
    pub async fn lock_by_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE",
        ))
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(user)
    }

    /// Lookup by the (email, role) pair, which is the account identity.
    pub async fn get_by_email_and_role(
        &self,
        email: &str,
        role: UserRole,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND role = $2",
        ))
        .bind(email)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch user by email and role: {}", e);
            AppError::Internal("Failed to fetch user".to_string())
        })?;

        Ok(user)
    }

    pub async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC",
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {}", e);
            AppError::Internal("Failed to list users".to_string())
        })?;

        Ok(users)
    }

    /// Fetch users by id, preserving the order of `ids` (used to render an
    /// organization's member list in roster order).
    pub async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id = ANY($1) \
             ORDER BY array_position($1, id)",
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch users by ids: {}", e);
            AppError::Internal("Failed to fetch users".to_string())
        })?;

        Ok(users)
    }

    /// Set the user's organization affiliation fields in one statement.
    pub async fn set_affiliation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        org_role: Option<OrgRole>,
        join_status: UserJoinStatus,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET organization_id = $2, org_role = $3, join_status = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .bind(org_role)
        .bind(join_status)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    pub async fn set_join_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        join_status: UserJoinStatus,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET join_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(join_status)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    pub async fn update_name(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        name: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(name)
            .execute(&mut **tx)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    pub async fn set_org_role(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        org_role: OrgRole,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET org_role = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(org_role)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    pub async fn set_verification(
        &self,
        user_id: Uuid,
        status: VerificationStatus,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET verification_status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}",
        ))
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                AppError::NotFound("User not found".to_string())
            } else {
                tracing::error!("Failed to update verification status: {}", e);
                AppError::Internal("Failed to update verification status".to_string())
            }
        })?;

        tracing::info!(user_id = %user_id, status = ?status, "Updated verification status");
        Ok(user)
    }

    pub async fn delete_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
