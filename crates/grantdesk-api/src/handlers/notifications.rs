//! Per-user notification endpoints.

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use grantdesk_core::models::Notification;
use grantdesk_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    responses((status = 200, description = "Caller's notifications, newest first", body = [Notification]))
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let notifications = state
        .db
        .notification_repository
        .list_for_user(ctx.user_id())
        .await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "notifications",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read"),
        (status = 404, description = "Notification not found for this user", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let updated = state
        .db
        .notification_repository
        .mark_read(notification_id, ctx.user_id())
        .await?;
    if !updated {
        return Err(AppError::NotFound("Notification not found".to_string()).into());
    }
    Ok(Json(serde_json::json!({ "status": "read" })))
}
