//! Platform-level user administration and verification review.

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use grantdesk_core::models::{AuditAction, User, UserRole, VerificationStatus};
use grantdesk_core::AppError;
use grantdesk_db::{NewAuditLog, TransactionGuard};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVerificationRequest {
    pub status: VerificationStatus,
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "All user accounts", body = [User]),
        (status = 403, description = "Caller is not a SuperAdmin", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require_super_admin()?;
    let users = state.db.user_repository.list_all().await?;
    Ok(Json(users))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Not a SuperAdmin, or self-deletion", body = ErrorResponse),
        (status = 409, description = "User is the last admin of an organization", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id(), target = %target_id))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require_super_admin()?;
    if target_id == ctx.user_id() {
        return Err(AppError::Forbidden(
            "SuperAdmins may not delete their own account".to_string(),
        )
        .into());
    }

    let target = state
        .db
        .user_repository
        .get_by_id(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut tx = TransactionGuard::begin(&state.db.pool).await?;

    // If the account is affiliated, strip it from the organization rosters.
    // The organization must not be left without an admin.
    if let Some(org_id) = target.organization_id {
        let mut org = state
            .db
            .organization_repository
            .lock_by_id(&mut tx, org_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
        if org.is_admin(target_id) && org.admin_count() == 1 {
            return Err(AppError::Conflict(
                "Cannot delete the last admin of an organization".to_string(),
            )
            .into());
        }
        org.admins.retain(|id| *id != target_id);
        org.members.retain(|id| *id != target_id);
        state
            .db
            .organization_repository
            .update_rosters(&mut tx, org.id, &org.admins, &org.members)
            .await?;
    }

    if !state.db.user_repository.delete_user(&mut tx, target_id).await? {
        return Err(AppError::NotFound("User not found".to_string()).into());
    }
    state
        .db
        .audit_log_repository
        .append_tx(
            &mut tx,
            &NewAuditLog {
                actor_id: Some(ctx.user_id()),
                actor_role: Some(ctx.role()),
                action: AuditAction::UserDeleted,
                entity_type: "user".to_string(),
                entity_id: Some(target_id),
                details: serde_json::json!({ "role": target.role }),
            },
        )
        .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

#[utoipa::path(
    put,
    path = "/users/{id}/verification",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateVerificationRequest,
    responses(
        (status = 200, description = "Verification status updated", body = User),
        (status = 403, description = "Caller may not review verifications", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id(), target = %target_id))]
pub async fn update_verification(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(target_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateVerificationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let may_review = matches!(
        ctx.role(),
        UserRole::Reviewer | UserRole::Approver | UserRole::SuperAdmin
    );
    if !may_review {
        return Err(AppError::Forbidden(
            "Only reviewers, approvers, and SuperAdmins review verifications".to_string(),
        )
        .into());
    }

    let user = state
        .db
        .user_repository
        .set_verification(target_id, payload.status)
        .await?;

    state
        .db
        .audit_log_repository
        .append(&NewAuditLog {
            actor_id: Some(ctx.user_id()),
            actor_role: Some(ctx.role()),
            action: AuditAction::VerificationChanged,
            entity_type: "user".to_string(),
            entity_id: Some(target_id),
            details: serde_json::json!({ "status": payload.status }),
        })
        .await;

    Ok(Json(user))
}
