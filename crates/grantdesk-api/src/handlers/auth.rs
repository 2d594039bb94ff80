//! Registration, login, and current-user endpoints.

use crate::auth::models::AuthContext;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::issue_token;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use grantdesk_core::models::{AuditAction, User, UserRole, VerificationStatus};
use grantdesk_core::AppError;
use grantdesk_db::{NewAuditLog, NewUser, TransactionGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: UserRole,
    #[serde(default)]
    pub profile: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 409, description = "Email already registered for this role", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let password_hash = hash_password(&payload.password)?;
    let verification_status = if payload.role.auto_verified() {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Unverified
    };

    let new_user = NewUser {
        name: payload.name,
        email: payload.email.to_lowercase(),
        password_hash,
        role: payload.role,
        organization_id: None,
        org_role: None,
        verification_status,
        profile: payload.profile.unwrap_or_else(|| serde_json::json!({})),
    };

    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    let user = state.db.user_repository.create_user(&mut tx, &new_user).await?;
    state
        .db
        .audit_log_repository
        .append_tx(
            &mut tx,
            &NewAuditLog {
                actor_id: Some(user.id),
                actor_role: Some(user.role),
                action: AuditAction::UserRegistered,
                entity_type: "user".to_string(),
                entity_id: Some(user.id),
                details: serde_json::json!({ "role": user.role }),
            },
        )
        .await?;
    tx.commit().await?;

    let token = issue_token(
        state.config.jwt_secret(),
        user.id,
        user.role,
        state.config.jwt_expiry_hours(),
    )?;

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state
        .db
        .user_repository
        .get_by_email_and_role(&payload.email.to_lowercase(), payload.role)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()).into());
    }

    let token = issue_token(
        state.config.jwt_secret(),
        user.id,
        user.role,
        state.config.jwt_expiry_hours(),
    )?;

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn me(ctx: AuthContext) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(ctx.user))
}
