//! Organization listing and creation.

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use grantdesk_core::membership;
use grantdesk_core::models::{AuditAction, OrgRole, Organization, OrganizationSummary, UserJoinStatus, UserRole};
use grantdesk_core::AppError;
use grantdesk_db::{NewAuditLog, TransactionGuard};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/organizations",
    tag = "organizations",
    responses(
        (status = 200, description = "All organizations", body = [OrganizationSummary])
    )
)]
pub async fn list_organizations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let orgs = state.db.organization_repository.list_summaries().await?;
    Ok(Json(orgs))
}

#[utoipa::path(
    post,
    path = "/organizations",
    tag = "organizations",
    request_body = CreateOrganizationRequest,
    responses(
        (status = 200, description = "Organization created", body = Organization),
        (status = 409, description = "Name taken or requester already affiliated", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id()))]
pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateOrganizationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require_role(UserRole::GrantMaker)?;

    // Creator becomes the sole admin and member in the same transaction.
    // The caller's row is re-read under a lock so the single-affiliation
    // guard holds at commit, not just at token-resolution time.
    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    let caller = state
        .db
        .user_repository
        .lock_by_id(&mut tx, ctx.user_id())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;
    membership::ensure_unaffiliated(&caller)?;
    let org = state
        .db
        .organization_repository
        .create(&mut tx, &payload.name, ctx.user_id())
        .await?;
    state
        .db
        .user_repository
        .set_affiliation(
            &mut tx,
            ctx.user_id(),
            Some(org.id),
            Some(OrgRole::Admin),
            UserJoinStatus::None,
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
                action: AuditAction::OrganizationCreated,
                entity_type: "organization".to_string(),
                entity_id: Some(org.id),
                details: serde_json::json!({ "name": org.name }),
            },
        )
        .await?;
    tx.commit().await?;

    Ok(Json(org))
}
