//! Application state shared across handlers.

use grantdesk_core::Config;
use grantdesk_db::{
    ApplicationRepository, AuditLogRepository, GrantRepository, JoinRequestRepository,
    NotificationRepository, OrganizationRepository, UserRepository,
};
use sqlx::PgPool;

/// Database pool and all repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub user_repository: UserRepository,
    pub organization_repository: OrganizationRepository,
    pub join_request_repository: JoinRequestRepository,
    pub grant_repository: GrantRepository,
    pub application_repository: ApplicationRepository,
    pub audit_log_repository: AuditLogRepository,
    pub notification_repository: NotificationRepository,
}

/// Main application state, handed to handlers behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub config: Config,
    pub is_production: bool,
}
