use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use grantdesk_core::models::{OrgRole, User, UserRole};
use grantdesk_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // user_id
    pub role: UserRole,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

/// Authenticated caller, extracted from the JWT by the auth middleware and
/// stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn is_super_admin(&self) -> bool {
        self.user.is_super_admin()
    }

    /// The caller's organization, or `Forbidden` if they belong to none.
    pub fn require_organization(&self) -> Result<Uuid, AppError> {
        self.user.organization_id.ok_or_else(|| {
            AppError::Forbidden("You are not a member of any organization".to_string())
        })
    }

    /// Caller must be an admin of their organization; returns the org id.
    pub fn require_org_admin(&self) -> Result<Uuid, AppError> {
        let org_id = self.require_organization()?;
        if self.user.org_role != Some(OrgRole::Admin) {
            return Err(AppError::Forbidden(
                "Only organization admins may perform this action".to_string(),
            ));
        }
        Ok(org_id)
    }

    pub fn require_role(&self, role: UserRole) -> Result<(), AppError> {
        if self.user.role != role {
            return Err(AppError::Forbidden(format!(
                "This action requires the {} role",
                role
            )));
        }
        Ok(())
    }

    pub fn require_super_admin(&self) -> Result<(), AppError> {
        self.require_role(UserRole::SuperAdmin)
    }
}

// Extract directly from request parts so handlers can take AuthContext as an
// argument next to other extractors.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Missing authentication context".to_string(),
                        details: None,
                        error_type: None,
                        code: "MISSING_AUTH_CONTEXT".to_string(),
                        recoverable: false,
                        suggested_action: Some("Check the authentication token".to_string()),
                    }),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_user(role: UserRole, org_role: Option<OrgRole>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            role,
            organization_id: org_role.map(|_| Uuid::new_v4()),
            org_role,
            join_status: grantdesk_core::models::UserJoinStatus::None,
            verification_status: grantdesk_core::models::VerificationStatus::Verified,
            profile: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_org_admin_rejects_plain_member() {
        let ctx = AuthContext {
            user: make_user(UserRole::Applicant, Some(OrgRole::Member)),
        };
        assert!(ctx.require_org_admin().is_err());
    }

    #[test]
    fn test_require_org_admin_accepts_admin() {
        let ctx = AuthContext {
            user: make_user(UserRole::Applicant, Some(OrgRole::Admin)),
        };
        assert!(ctx.require_org_admin().is_ok());
    }

    #[test]
    fn test_require_organization_rejects_unaffiliated() {
        let ctx = AuthContext {
            user: make_user(UserRole::Applicant, None),
        };
        assert!(ctx.require_organization().is_err());
    }

    #[test]
    fn test_require_super_admin() {
        let ctx = AuthContext {
            user: make_user(UserRole::SuperAdmin, None),
        };
        assert!(ctx.require_super_admin().is_ok());
        assert!(ctx.require_role(UserRole::Approver).is_err());
    }
}
