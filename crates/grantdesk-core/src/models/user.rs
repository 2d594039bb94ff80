use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Platform-wide user role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Applicant,
    GrantMaker,
    Reviewer,
    Approver,
    SuperAdmin,
}

impl UserRole {
    /// Reviewer, approver, and super-admin accounts are trusted at creation.
    pub fn auto_verified(&self) -> bool {
        matches!(
            self,
            UserRole::Reviewer | UserRole::Approver | UserRole::SuperAdmin
        )
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UserRole::Applicant => write!(f, "applicant"),
            UserRole::GrantMaker => write!(f, "grant_maker"),
            UserRole::Reviewer => write!(f, "reviewer"),
            UserRole::Approver => write!(f, "approver"),
            UserRole::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

/// Role within an organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "org_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    Admin,
    Member,
}

/// Join-request state carried on the user record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "user_join_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserJoinStatus {
    None,
    Pending,
    Rejected,
}

/// Trust flag gating grant creation and application eligibility
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "verification_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
}

/// User entity. Email is unique per role: the same address may register as an
/// applicant and as a grant maker, and those are distinct accounts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub organization_id: Option<Uuid>,
    pub org_role: Option<OrgRole>,
    pub join_status: UserJoinStatus,
    pub verification_status: VerificationStatus,
    pub profile: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_verified_roles() {
        assert!(UserRole::Reviewer.auto_verified());
        assert!(UserRole::Approver.auto_verified());
        assert!(UserRole::SuperAdmin.auto_verified());
        assert!(!UserRole::Applicant.auto_verified());
        assert!(!UserRole::GrantMaker.auto_verified());
    }

    #[test]
    fn test_role_serde_snake_case() {
        let json = serde_json::to_string(&UserRole::GrantMaker).unwrap();
        assert_eq!(json, "\"grant_maker\"");
        let role: UserRole = serde_json::from_str("\"super_admin\"").unwrap();
        assert_eq!(role, UserRole::SuperAdmin);
    }

    #[test]
    fn test_unknown_org_role_rejected() {
        // Closed enum: an unrecognized value is a deserialization error, not
        // a silently ignored string.
        let result: Result<OrgRole, _> = serde_json::from_str("\"owner\"");
        assert!(result.is_err());
    }
}
