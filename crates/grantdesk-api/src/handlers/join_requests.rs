//! Join-request submission, listing, and resolution.

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use grantdesk_core::membership;
use grantdesk_core::models::{
    AuditAction, JoinRequest, JoinRequestStatus, OrgRole, UserJoinStatus,
};
use grantdesk_core::AppError;
use grantdesk_db::{NewAuditLog, PendingJoinRequest, TransactionGuard};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct JoinOrganizationRequest {
    pub organization_id: Uuid,
}

/// Resolution verb for a pending join request.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResolveAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResolveJoinRequestBody {
    pub action: ResolveAction,
}

#[utoipa::path(
    post,
    path = "/organizations/join",
    tag = "join-requests",
    request_body = JoinOrganizationRequest,
    responses(
        (status = 200, description = "Join request created", body = JoinRequest),
        (status = 409, description = "Already affiliated or already has a pending request", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id()))]
pub async fn request_to_join(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    ValidatedJson(payload): ValidatedJson<JoinOrganizationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let has_pending = state
        .db
        .join_request_repository
        .has_pending_for_user(ctx.user_id())
        .await?;
    membership::ensure_may_request_join(&ctx.user, has_pending)?;
    state
        .db
        .organization_repository
        .get_by_id(payload.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    let request = state
        .db
        .join_request_repository
        .create(&mut tx, ctx.user_id(), payload.organization_id)
        .await?;
    state
        .db
        .user_repository
        .set_join_status(&mut tx, ctx.user_id(), UserJoinStatus::Pending)
        .await?;
    state
        .db
        .audit_log_repository
        .append_tx(
            &mut tx,
            &NewAuditLog {
                actor_id: Some(ctx.user_id()),
                actor_role: Some(ctx.role()),
                action: AuditAction::JoinRequested,
                entity_type: "join_request".to_string(),
                entity_id: Some(request.id),
                details: serde_json::json!({ "organization_id": payload.organization_id }),
            },
        )
        .await?;
    tx.commit().await?;

    Ok(Json(request))
}

#[utoipa::path(
    get,
    path = "/organizations/{id}/join-requests",
    tag = "join-requests",
    params(("id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Pending requests for the organization", body = [PendingJoinRequest]),
        (status = 403, description = "Caller is not an admin of this organization", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn list_join_requests(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(org_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let org = state
        .db
        .organization_repository
        .get_by_id(org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    membership::ensure_admin(&org, ctx.user_id())?;

    let requests = state
        .db
        .join_request_repository
        .list_pending_for_org(org_id)
        .await?;
    Ok(Json(requests))
}

/// Pre-mutation validation for a resolution. Admin rights are checked
/// before the request's state, so callers without them never learn whether
/// a given request id is pending or resolved.
fn validate_resolution(
    org: &grantdesk_core::models::Organization,
    actor_id: Uuid,
    status: JoinRequestStatus,
) -> Result<(), AppError> {
    membership::ensure_admin(org, actor_id)?;
    if status != JoinRequestStatus::Pending {
        return Err(AppError::Conflict(
            "Join request has already been resolved".to_string(),
        ));
    }
    Ok(())
}

#[utoipa::path(
    put,
    path = "/organizations/join-requests/{request_id}",
    tag = "join-requests",
    params(("request_id" = Uuid, Path, description = "Join request ID")),
    request_body = ResolveJoinRequestBody,
    responses(
        (status = 200, description = "Request resolved"),
        (status = 403, description = "Caller is not an admin of the target organization", body = ErrorResponse),
        (status = 404, description = "Request or requester not found", body = ErrorResponse),
        (status = 409, description = "Request already resolved or requester already affiliated", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id(), request_id = %request_id))]
pub async fn resolve_join_request(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(request_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ResolveJoinRequestBody>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = state
        .db
        .join_request_repository
        .get_by_id(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Join request not found".to_string()))?;

    // Only admins of the target organization resolve its requests; there is
    // no SuperAdmin bypass for organization-scoped membership decisions. The
    // admin check runs before the request's state is examined or mutated, so
    // a non-admin holding a request id learns nothing and triggers nothing.
    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    let mut org = state
        .db
        .organization_repository
        .lock_by_id(&mut tx, request.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    validate_resolution(&org, ctx.user_id(), request.status)?;

    // Re-read the requester under a row lock: the affiliation guard below
    // stays true until commit. A missing row means the account was deleted;
    // the orphaned request is removed.
    let Some(requester) = state
        .db
        .user_repository
        .lock_by_id(&mut tx, request.user_id)
        .await?
    else {
        tx.rollback().await?;
        state.db.join_request_repository.delete(request_id).await?;
        return Err(AppError::NotFound(
            "The requesting user no longer exists".to_string(),
        )
        .into());
    };

    match payload.action {
        ResolveAction::Approve => {
            membership::ensure_unaffiliated(&requester)?;

            state
                .db
                .join_request_repository
                .set_status(&mut tx, request_id, JoinRequestStatus::Approved)
                .await?;
            state
                .db
                .user_repository
                .set_affiliation(
                    &mut tx,
                    requester.id,
                    Some(org.id),
                    Some(OrgRole::Member),
                    UserJoinStatus::None,
                )
                .await?;
            if membership::add_member(&mut org, requester.id) {
                state
                    .db
                    .organization_repository
                    .update_rosters(&mut tx, org.id, &org.admins, &org.members)
                    .await?;
            }
            state
                .db
                .notification_repository
                .notify(
                    &mut tx,
                    requester.id,
                    &format!("Your request to join {} was approved", org.name),
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
                        action: AuditAction::JoinRequestApproved,
                        entity_type: "join_request".to_string(),
                        entity_id: Some(request_id),
                        details: serde_json::json!({
                            "user_id": requester.id,
                            "organization_id": org.id,
                        }),
                    },
                )
                .await?;
        }
        ResolveAction::Reject => {
            // The request is retained with status Rejected so the history
            // stays auditable; the account remains active and unaffiliated.
            state
                .db
                .join_request_repository
                .set_status(&mut tx, request_id, JoinRequestStatus::Rejected)
                .await?;
            state
                .db
                .user_repository
                .set_join_status(&mut tx, requester.id, UserJoinStatus::Rejected)
                .await?;
            state
                .db
                .notification_repository
                .notify(
                    &mut tx,
                    requester.id,
                    &format!("Your request to join {} was rejected", org.name),
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
                        action: AuditAction::JoinRequestRejected,
                        entity_type: "join_request".to_string(),
                        entity_id: Some(request_id),
                        details: serde_json::json!({
                            "user_id": requester.id,
                            "organization_id": org.id,
                        }),
                    },
                )
                .await?;
        }
    }
    tx.commit().await?;

    Ok(Json(serde_json::json!({ "status": "resolved" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use grantdesk_core::models::Organization;

    fn org_with_admin(admin: Uuid) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            admins: vec![admin],
            members: vec![admin],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_non_admin_is_rejected_before_request_state_is_examined() {
        let admin = Uuid::new_v4();
        let outsider = Uuid::new_v4();
        let org = org_with_admin(admin);

        // A non-admin probing a resolved request gets Forbidden, not the
        // Conflict that would reveal the request's state.
        let err = validate_resolution(&org, outsider, JoinRequestStatus::Approved).unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");
        let err = validate_resolution(&org, outsider, JoinRequestStatus::Pending).unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");
    }

    #[test]
    fn test_resolved_request_conflicts_for_admin() {
        let admin = Uuid::new_v4();
        let org = org_with_admin(admin);

        let err = validate_resolution(&org, admin, JoinRequestStatus::Rejected).unwrap_err();
        assert_eq!(err.error_type(), "Conflict");
        assert!(validate_resolution(&org, admin, JoinRequestStatus::Pending).is_ok());
    }
}
