//! Database repositories for the data access layer
//!
//! Repositories are organized per domain entity. Reads run against the pool;
//! writes that participate in multi-entity transitions take a
//! `&mut Transaction` so handlers can commit or roll back as one unit.

pub mod applications;
pub mod audit;
pub mod grants;
pub mod join_requests;
pub mod notifications;
pub mod organizations;
pub mod transaction;
pub mod users;

pub use applications::ApplicationRepository;
pub use audit::{AuditLogRepository, NewAuditLog};
pub use grants::{GrantRepository, NewGrant};
pub use join_requests::{JoinRequestRepository, PendingJoinRequest};
pub use notifications::NotificationRepository;
pub use organizations::OrganizationRepository;
pub use users::{NewUser, UserRepository};

use grantdesk_core::AppError;

/// Map a unique-constraint violation to `Conflict`; everything else stays a
/// database error. Handlers pre-check invariants, this is the backstop for
/// concurrent writers.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(err)
}
