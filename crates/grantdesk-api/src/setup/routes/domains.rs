//! Domain route groups (organizations, grants, platform administration).

use crate::handlers;
use crate::state::AppState;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;

pub fn organization_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/organizations",
            post(handlers::organizations::create_organization),
        )
        .route(
            "/organizations/join",
            post(handlers::join_requests::request_to_join),
        )
        .route(
            "/organizations/join-requests/{request_id}",
            put(handlers::join_requests::resolve_join_request),
        )
        .route(
            "/organizations/{id}/join-requests",
            get(handlers::join_requests::list_join_requests),
        )
        .route(
            "/organizations/{id}/members",
            get(handlers::members::list_members).post(handlers::members::add_member),
        )
        .route(
            "/organizations/{org_id}/members/{member_id}",
            put(handlers::members::update_member).delete(handlers::members::remove_member),
        )
        .with_state(state)
}

pub fn grant_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/grants",
            get(handlers::grants::list_grants).post(handlers::grants::create_grant),
        )
        .route(
            "/grants/{id}",
            get(handlers::grants::get_grant)
                .put(handlers::grants::update_grant)
                .delete(handlers::grants::delete_grant),
        )
        .route(
            "/grants/{id}/applications",
            get(handlers::applications::list_grant_applications)
                .post(handlers::applications::submit_application),
        )
        .route(
            "/applications",
            get(handlers::applications::list_my_applications),
        )
        .route(
            "/applications/{id}/status",
            put(handlers::applications::update_application_status),
        )
        .with_state(state)
}

pub fn platform_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/audit-logs", get(handlers::audit_logs::query_audit_logs))
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notifications::mark_notification_read),
        )
        .route("/users", get(handlers::users::list_users))
        .route("/users/{id}", delete(handlers::users::delete_user))
        .route(
            "/users/{id}/verification",
            put(handlers::users::update_verification),
        )
        .with_state(state)
}
