//! Grant CRUD and lifecycle endpoints.

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use grantdesk_core::models::{AuditAction, Grant, GrantQuestion, GrantStatus, UserRole};
use grantdesk_core::AppError;
use grantdesk_db::{NewAuditLog, NewGrant, TransactionGuard};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGrantRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10_000))]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<GrantQuestion>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGrantRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10_000))]
    pub description: Option<String>,
    pub questions: Option<Vec<GrantQuestion>>,
    pub status: Option<GrantStatus>,
    pub reviewers: Option<Vec<Uuid>>,
    pub approvers: Option<Vec<Uuid>>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Grant creation and mutation require a verified Grant Maker.
fn require_verified_grant_maker(ctx: &AuthContext) -> Result<(), AppError> {
    ctx.require_role(UserRole::GrantMaker)?;
    if !ctx.user.is_verified() {
        return Err(AppError::Forbidden(
            "Your account must be verified before managing grants".to_string(),
        ));
    }
    Ok(())
}

fn ensure_grant_owner(grant: &Grant, ctx: &AuthContext) -> Result<(), AppError> {
    if grant.grant_maker_id != ctx.user_id() {
        return Err(AppError::Forbidden(
            "Only the owning grant maker may modify this grant".to_string(),
        ));
    }
    Ok(())
}

/// An existing grant may be modified or deleted by its owner, who must be a
/// verified Grant Maker, or by a SuperAdmin.
fn ensure_may_modify_grant(grant: &Grant, ctx: &AuthContext) -> Result<(), AppError> {
    if ctx.is_super_admin() {
        return Ok(());
    }
    require_verified_grant_maker(ctx)?;
    ensure_grant_owner(grant, ctx)
}

#[utoipa::path(
    post,
    path = "/grants",
    tag = "grants",
    request_body = CreateGrantRequest,
    responses(
        (status = 200, description = "Grant created as draft", body = Grant),
        (status = 403, description = "Caller is not a verified grant maker", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id()))]
pub async fn create_grant(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateGrantRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_verified_grant_maker(&ctx)?;

    let grant = state
        .db
        .grant_repository
        .create(&NewGrant {
            grant_maker_id: ctx.user_id(),
            organization_id: ctx.user.organization_id,
            title: payload.title,
            description: payload.description,
            questions: serde_json::to_value(&payload.questions).map_err(AppError::from)?,
            deadline: payload.deadline,
        })
        .await?;

    state
        .db
        .audit_log_repository
        .append(&NewAuditLog {
            actor_id: Some(ctx.user_id()),
            actor_role: Some(ctx.role()),
            action: AuditAction::GrantCreated,
            entity_type: "grant".to_string(),
            entity_id: Some(grant.id),
            details: serde_json::json!({ "title": grant.title }),
        })
        .await;

    Ok(Json(grant))
}

#[utoipa::path(
    get,
    path = "/grants",
    tag = "grants",
    responses((status = 200, description = "Grants visible to the caller", body = [Grant]))
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn list_grants(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let grants = match ctx.role() {
        UserRole::GrantMaker => state.db.grant_repository.list_for_maker(ctx.user_id()).await?,
        UserRole::Reviewer | UserRole::Approver => {
            state.db.grant_repository.list_for_assignee(ctx.user_id()).await?
        }
        _ => state.db.grant_repository.list_published().await?,
    };
    Ok(Json(grants))
}

#[utoipa::path(
    get,
    path = "/grants/{id}",
    tag = "grants",
    params(("id" = Uuid, Path, description = "Grant ID")),
    responses(
        (status = 200, description = "Grant found", body = Grant),
        (status = 404, description = "Grant not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn get_grant(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(grant_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let grant = state
        .db
        .grant_repository
        .get_by_id(grant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Grant not found".to_string()))?;

    // Drafts and closed grants are visible only to the owner, assigned
    // reviewers/approvers, and SuperAdmins.
    let visible = grant.status == GrantStatus::Published
        || grant.grant_maker_id == ctx.user_id()
        || grant.reviewers.contains(&ctx.user_id())
        || grant.approvers.contains(&ctx.user_id())
        || ctx.is_super_admin();
    if !visible {
        return Err(AppError::NotFound("Grant not found".to_string()).into());
    }

    Ok(Json(grant))
}

#[utoipa::path(
    put,
    path = "/grants/{id}",
    tag = "grants",
    params(("id" = Uuid, Path, description = "Grant ID")),
    request_body = UpdateGrantRequest,
    responses(
        (status = 200, description = "Grant updated", body = Grant),
        (status = 403, description = "Caller does not own this grant", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id()))]
pub async fn update_grant(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(grant_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateGrantRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut grant = state
        .db
        .grant_repository
        .get_by_id(grant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Grant not found".to_string()))?;
    ensure_may_modify_grant(&grant, &ctx)?;

    if let Some(title) = payload.title {
        grant.title = title;
    }
    if let Some(description) = payload.description {
        grant.description = description;
    }
    if let Some(questions) = payload.questions {
        grant.questions = serde_json::to_value(&questions).map_err(AppError::from)?;
    }
    if let Some(status) = payload.status {
        grant.status = status;
    }
    if let Some(reviewers) = payload.reviewers {
        grant.reviewers = reviewers;
    }
    if let Some(approvers) = payload.approvers {
        grant.approvers = approvers;
    }
    if payload.deadline.is_some() {
        grant.deadline = payload.deadline;
    }

    let updated = state.db.grant_repository.update(&grant).await?;

    state
        .db
        .audit_log_repository
        .append(&NewAuditLog {
            actor_id: Some(ctx.user_id()),
            actor_role: Some(ctx.role()),
            action: AuditAction::GrantUpdated,
            entity_type: "grant".to_string(),
            entity_id: Some(updated.id),
            details: serde_json::json!({ "status": updated.status }),
        })
        .await;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/grants/{id}",
    tag = "grants",
    params(("id" = Uuid, Path, description = "Grant ID")),
    responses(
        (status = 200, description = "Grant and its applications deleted"),
        (status = 403, description = "Caller does not own this grant", body = ErrorResponse),
        (status = 404, description = "Grant not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn delete_grant(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(grant_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let grant = state
        .db
        .grant_repository
        .get_by_id(grant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Grant not found".to_string()))?;
    ensure_may_modify_grant(&grant, &ctx)?;

    // The grant and its applications go together or not at all.
    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    let cascaded = state
        .db
        .grant_repository
        .delete_with_applications(&mut tx, grant_id)
        .await?;
    state
        .db
        .audit_log_repository
        .append_tx(
            &mut tx,
            &NewAuditLog {
                actor_id: Some(ctx.user_id()),
                actor_role: Some(ctx.role()),
                action: AuditAction::GrantDeleted,
                entity_type: "grant".to_string(),
                entity_id: Some(grant_id),
                details: serde_json::json!({ "cascaded_applications": cascaded }),
            },
        )
        .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "status": "deleted",
        "cascaded_applications": cascaded,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantdesk_core::models::{OrgRole, User, UserJoinStatus, VerificationStatus};

    fn maker(role: UserRole, verification: VerificationStatus) -> AuthContext {
        AuthContext {
            user: User {
                id: Uuid::new_v4(),
                name: "Maker".to_string(),
                email: "maker@example.com".to_string(),
                password_hash: "hash".to_string(),
                role,
                organization_id: None,
                org_role: None::<OrgRole>,
                join_status: UserJoinStatus::None,
                verification_status: verification,
                profile: serde_json::json!({}),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    fn grant_owned_by(owner: Uuid) -> Grant {
        Grant {
            id: Uuid::new_v4(),
            grant_maker_id: owner,
            organization_id: None,
            title: "Research".to_string(),
            description: "A grant".to_string(),
            questions: serde_json::json!([]),
            status: GrantStatus::Draft,
            reviewers: vec![],
            approvers: vec![],
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_verified_owner_may_modify() {
        let ctx = maker(UserRole::GrantMaker, VerificationStatus::Verified);
        let grant = grant_owned_by(ctx.user_id());
        assert!(ensure_may_modify_grant(&grant, &ctx).is_ok());
    }

    #[test]
    fn test_unverified_owner_may_not_modify() {
        let ctx = maker(UserRole::GrantMaker, VerificationStatus::Unverified);
        let grant = grant_owned_by(ctx.user_id());
        let err = ensure_may_modify_grant(&grant, &ctx).unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");
    }

    #[test]
    fn test_verified_non_owner_may_not_modify() {
        let ctx = maker(UserRole::GrantMaker, VerificationStatus::Verified);
        let grant = grant_owned_by(Uuid::new_v4());
        let err = ensure_may_modify_grant(&grant, &ctx).unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");
    }

    #[test]
    fn test_super_admin_may_modify_any_grant() {
        let ctx = maker(UserRole::SuperAdmin, VerificationStatus::Verified);
        let grant = grant_owned_by(Uuid::new_v4());
        assert!(ensure_may_modify_grant(&grant, &ctx).is_ok());
    }
}
