//! Repository initialization and application state construction.

use crate::state::{AppState, DbState};
use grantdesk_core::Config;
use grantdesk_db::{
    ApplicationRepository, AuditLogRepository, GrantRepository, JoinRequestRepository,
    NotificationRepository, OrganizationRepository, UserRepository,
};
use sqlx::PgPool;
use std::sync::Arc;

/// Initialize all repositories, returning the application state
pub fn initialize_services(config: &Config, pool: PgPool) -> Arc<AppState> {
    let db = DbState {
        pool: pool.clone(),
        user_repository: UserRepository::new(pool.clone()),
        organization_repository: OrganizationRepository::new(pool.clone()),
        join_request_repository: JoinRequestRepository::new(pool.clone()),
        grant_repository: GrantRepository::new(pool.clone()),
        application_repository: ApplicationRepository::new(pool.clone()),
        audit_log_repository: AuditLogRepository::new(pool.clone()),
        notification_repository: NotificationRepository::new(pool),
    };

    Arc::new(AppState {
        db,
        is_production: config.is_production(),
        config: config.clone(),
    })
}
