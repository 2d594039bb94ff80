//! Organization member listing and management.

use crate::auth::models::AuthContext;
use crate::auth::password::hash_password;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use grantdesk_core::membership;
use grantdesk_core::models::{
    AuditAction, OrgRole, Organization, User, UserRole, VerificationStatus,
};
use grantdesk_core::AppError;
use grantdesk_db::{NewAuditLog, NewUser, TransactionGuard};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddMemberRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMemberRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub org_role: Option<OrgRole>,
}

/// Authorize an org-scoped management action: the caller must be an admin of
/// the organization, or a SuperAdmin.
fn ensure_admin_or_super(org: &Organization, ctx: &AuthContext) -> Result<(), AppError> {
    if ctx.is_super_admin() {
        return Ok(());
    }
    membership::ensure_admin(org, ctx.user_id())
}

#[utoipa::path(
    get,
    path = "/organizations/{id}/members",
    tag = "members",
    params(("id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization members", body = [User]),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    // SuperAdmin may name any organization; everyone else is served their
    // own affiliated organization regardless of the path parameter.
    let target_org_id = if ctx.is_super_admin() {
        org_id
    } else {
        ctx.require_organization()?
    };

    let org = state
        .db
        .organization_repository
        .get_by_id(target_org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let members = state.db.user_repository.list_by_ids(&org.members).await?;
    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/organizations/{id}/members",
    tag = "members",
    params(("id" = Uuid, Path, description = "Organization ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Member created and affiliated", body = User),
        (status = 403, description = "Caller is not an admin of this organization", body = ErrorResponse),
        (status = 409, description = "Email already registered for this role", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id()))]
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(org_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AddMemberRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let password_hash = hash_password(&payload.password)?;

    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    let mut org = state
        .db
        .organization_repository
        .lock_by_id(&mut tx, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    membership::ensure_admin(&org, ctx.user_id())?;

    let verification_status = if payload.role.auto_verified() {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Unverified
    };
    let user = state
        .db
        .user_repository
        .create_user(
            &mut tx,
            &NewUser {
                name: payload.name,
                email: payload.email.to_lowercase(),
                password_hash,
                role: payload.role,
                organization_id: Some(org.id),
                org_role: Some(OrgRole::Member),
                verification_status,
                profile: serde_json::json!({}),
            },
        )
        .await?;

    membership::add_member(&mut org, user.id);
    state
        .db
        .organization_repository
        .update_rosters(&mut tx, org.id, &org.admins, &org.members)
        .await?;
    state
        .db
        .audit_log_repository
        .append_tx(
            &mut tx,
            &NewAuditLog {
                actor_id: Some(ctx.user_id()),
                actor_role: Some(ctx.role()),
                action: AuditAction::MemberAdded,
                entity_type: "organization".to_string(),
                entity_id: Some(org.id),
                details: serde_json::json!({ "member_id": user.id }),
            },
        )
        .await?;
    tx.commit().await?;

    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/organizations/{org_id}/members/{member_id}",
    tag = "members",
    params(
        ("org_id" = Uuid, Path, description = "Organization ID"),
        ("member_id" = Uuid, Path, description = "Member user ID")
    ),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Member updated", body = User),
        (status = 403, description = "Caller lacks admin rights", body = ErrorResponse),
        (status = 409, description = "Demoting the last admin", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id(), member_id = %member_id))]
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path((org_id, member_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateMemberRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    let mut org = state
        .db
        .organization_repository
        .lock_by_id(&mut tx, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    ensure_admin_or_super(&org, &ctx)?;
    membership::ensure_member(&org, member_id)?;

    if let Some(name) = &payload.name {
        state
            .db
            .user_repository
            .update_name(&mut tx, member_id, name)
            .await?;
    }

    if let Some(new_role) = payload.org_role {
        // The last-admin guard runs against the row-locked organization, so
        // a concurrent demotion cannot slip past it.
        if membership::change_role(&mut org, member_id, new_role)? {
            state
                .db
                .organization_repository
                .update_rosters(&mut tx, org.id, &org.admins, &org.members)
                .await?;
        }
        state
            .db
            .user_repository
            .set_org_role(&mut tx, member_id, new_role)
            .await?;
        state
            .db
            .audit_log_repository
            .append_tx(
                &mut tx,
                &NewAuditLog {
                    actor_id: Some(ctx.user_id()),
                    actor_role: Some(ctx.role()),
                    action: AuditAction::MemberRoleChanged,
                    entity_type: "organization".to_string(),
                    entity_id: Some(org.id),
                    details: serde_json::json!({
                        "member_id": member_id,
                        "org_role": new_role,
                    }),
                },
            )
            .await?;
    }
    tx.commit().await?;

    let user = state
        .db
        .user_repository
        .get_by_id(member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/organizations/{org_id}/members/{member_id}",
    tag = "members",
    params(
        ("org_id" = Uuid, Path, description = "Organization ID"),
        ("member_id" = Uuid, Path, description = "Member user ID")
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 403, description = "Caller lacks admin rights", body = ErrorResponse),
        (status = 409, description = "Self-removal or last-admin protection", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id(), member_id = %member_id))]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path((org_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    let mut org = state
        .db
        .organization_repository
        .lock_by_id(&mut tx, org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    ensure_admin_or_super(&org, &ctx)?;

    membership::remove_member(&mut org, ctx.user_id(), member_id)?;
    state
        .db
        .organization_repository
        .update_rosters(&mut tx, org.id, &org.admins, &org.members)
        .await?;
    state
        .db
        .user_repository
        .set_affiliation(
            &mut tx,
            member_id,
            None,
            None,
            grantdesk_core::models::UserJoinStatus::None,
        )
        .await?;
    state
        .db
        .audit_log_repository
        .append_tx(
            &mut tx,
            &NewAuditLog {
                actor_id: Some(ctx.user_id()),
                actor_role: Some(ctx.role()),
                action: AuditAction::MemberRemoved,
                entity_type: "organization".to_string(),
                entity_id: Some(org.id),
                details: serde_json::json!({ "member_id": member_id }),
            },
        )
        .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({ "status": "removed" })))
}
