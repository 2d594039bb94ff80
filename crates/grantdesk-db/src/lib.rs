//! Grantdesk Database Layer
//!
//! This crate provides database repositories and data access functionality.
//! Each repository owns the queries for one domain entity; multi-entity
//! transitions take an explicit transaction so callers control atomicity.

pub mod db;

pub use db::transaction::TransactionGuard;
pub use db::{
    ApplicationRepository, AuditLogRepository, GrantRepository, JoinRequestRepository,
    NotificationRepository, OrganizationRepository, UserRepository,
};
pub use db::{NewAuditLog, NewGrant, NewUser, PendingJoinRequest};
