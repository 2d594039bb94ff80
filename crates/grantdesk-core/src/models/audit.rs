use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::UserRole;

/// Sensitive actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "audit_action", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserRegistered,
    UserDeleted,
    VerificationChanged,
    OrganizationCreated,
    JoinRequested,
    JoinRequestApproved,
    JoinRequestRejected,
    MemberAdded,
    MemberRoleChanged,
    MemberRemoved,
    GrantCreated,
    GrantUpdated,
    GrantDeleted,
    ApplicationSubmitted,
    ApplicationStatusChanged,
}

/// Append-only audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_role: Option<UserRole>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Filter set for audit trail queries. All fields combine with AND; absent
/// fields are unconstrained.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuditFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
