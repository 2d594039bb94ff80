//! Audit-trail query endpoint (SuperAdmin only).

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use grantdesk_core::models::{AuditFilter, AuditLog};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/audit-logs",
    tag = "audit",
    responses(
        (status = 200, description = "Matching audit entries, newest first", body = [AuditLog]),
        (status = 403, description = "Caller is not a SuperAdmin", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, filter), fields(user_id = %ctx.user_id()))]
pub async fn query_audit_logs(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Query(filter): Query<AuditFilter>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require_super_admin()?;
    let logs = state.db.audit_log_repository.query(&filter).await?;
    Ok(Json(logs))
}
