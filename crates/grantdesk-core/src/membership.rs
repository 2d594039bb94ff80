//! Organization membership transitions.
//!
//! Pure guard and transition functions over [`Organization`]. Repositories
//! load the organization (with a row lock), apply one of these transitions,
//! and persist the mutated admin/member lists in the same transaction, so
//! every guard here is re-validated against current state.
//!
//! The central invariant: an organization always retains at least one admin.
//! Any transition that would empty the admin list fails with `Conflict` and
//! leaves the organization unchanged.

use crate::models::{OrgRole, Organization, User, UserJoinStatus};
use crate::AppError;
use uuid::Uuid;

/// Verify `user_id` is an admin of the organization.
pub fn ensure_admin(org: &Organization, user_id: Uuid) -> Result<(), AppError> {
    if org.is_admin(user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only organization admins may perform this action".to_string(),
        ))
    }
}

/// Verify `user_id` belongs to the organization.
pub fn ensure_member(org: &Organization, user_id: Uuid) -> Result<(), AppError> {
    if org.is_member(user_id) {
        Ok(())
    } else {
        Err(AppError::NotFound(
            "User is not a member of this organization".to_string(),
        ))
    }
}

/// Verify the user holds no organization affiliation. Users belong to at
/// most one organization at a time; approval and organization creation both
/// run this against a row-locked user record.
pub fn ensure_unaffiliated(user: &User) -> Result<(), AppError> {
    if user.organization_id.is_some() {
        return Err(AppError::Conflict(
            "User already belongs to an organization".to_string(),
        ));
    }
    Ok(())
}

/// Guard for submitting a join request: the user must be unaffiliated and
/// must not already have a pending request, on either the request table or
/// the user record.
pub fn ensure_may_request_join(user: &User, has_pending_request: bool) -> Result<(), AppError> {
    ensure_unaffiliated(user)?;
    if has_pending_request || user.join_status == UserJoinStatus::Pending {
        return Err(AppError::Conflict(
            "A pending join request already exists".to_string(),
        ));
    }
    Ok(())
}

/// Append a user to the member list. Idempotent; returns whether the list
/// changed.
pub fn add_member(org: &mut Organization, user_id: Uuid) -> bool {
    if org.is_member(user_id) {
        return false;
    }
    org.members.push(user_id);
    true
}

/// Change a member's organization role.
///
/// Promotion to admin is idempotent: promoting an existing admin never
/// duplicates their id. Demotion of the last remaining admin is rejected
/// with `Conflict` and the organization is left untouched.
///
/// Returns whether the admin list changed.
pub fn change_role(
    org: &mut Organization,
    member_id: Uuid,
    new_role: OrgRole,
) -> Result<bool, AppError> {
    ensure_member(org, member_id)?;
    match new_role {
        OrgRole::Admin => {
            if org.is_admin(member_id) {
                return Ok(false);
            }
            org.admins.push(member_id);
            Ok(true)
        }
        OrgRole::Member => {
            if !org.is_admin(member_id) {
                return Ok(false);
            }
            if org.admin_count() == 1 {
                return Err(AppError::Conflict(
                    "Cannot demote the last admin of the organization".to_string(),
                ));
            }
            org.admins.retain(|id| *id != member_id);
            Ok(true)
        }
    }
}

/// Remove a member from the organization.
///
/// The actor may not remove themself, and the last admin cannot be removed.
/// Strips the member id from both the member and admin lists.
pub fn remove_member(
    org: &mut Organization,
    actor_id: Uuid,
    member_id: Uuid,
) -> Result<(), AppError> {
    ensure_member(org, member_id)?;
    if actor_id == member_id {
        return Err(AppError::Conflict(
            "Admins cannot remove themselves from the organization".to_string(),
        ));
    }
    if org.is_admin(member_id) && org.admin_count() == 1 {
        return Err(AppError::Conflict(
            "Cannot remove the last admin of the organization".to_string(),
        ));
    }
    org.members.retain(|id| *id != member_id);
    org.admins.retain(|id| *id != member_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserRole, VerificationStatus};
    use chrono::Utc;

    fn org_with(admins: Vec<Uuid>, members: Vec<Uuid>) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            admins,
            members,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user_with(organization_id: Option<Uuid>, join_status: UserJoinStatus) -> User {
        User {
            id: Uuid::new_v4(),
            name: "U".to_string(),
            email: "u@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::Applicant,
            organization_id,
            org_role: organization_id.map(|_| OrgRole::Member),
            join_status,
            verification_status: VerificationStatus::Unverified,
            profile: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sole_admin_cannot_demote_self() {
        let a = Uuid::new_v4();
        let mut org = org_with(vec![a], vec![a]);

        let err = change_role(&mut org, a, OrgRole::Member).unwrap_err();
        assert_eq!(err.error_type(), "Conflict");
        // State unchanged
        assert_eq!(org.admins, vec![a]);
    }

    #[test]
    fn test_demote_allowed_with_two_admins() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut org = org_with(vec![a], vec![a, b]);

        // A promotes B, then demotes self: allowed, admins = {B}
        assert!(change_role(&mut org, b, OrgRole::Admin).unwrap());
        assert!(change_role(&mut org, a, OrgRole::Member).unwrap());
        assert_eq!(org.admins, vec![b]);
        assert!(org.is_member(a));
    }

    #[test]
    fn test_admin_promotion_is_idempotent() {
        let a = Uuid::new_v4();
        let mut org = org_with(vec![a], vec![a]);

        assert!(!change_role(&mut org, a, OrgRole::Admin).unwrap());
        assert_eq!(org.admins, vec![a], "no duplicate admin entries");
    }

    #[test]
    fn test_demote_non_admin_is_noop() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut org = org_with(vec![a], vec![a, b]);

        assert!(!change_role(&mut org, b, OrgRole::Member).unwrap());
        assert_eq!(org.admins, vec![a]);
    }

    #[test]
    fn test_change_role_requires_membership() {
        let a = Uuid::new_v4();
        let outsider = Uuid::new_v4();
        let mut org = org_with(vec![a], vec![a]);

        let err = change_role(&mut org, outsider, OrgRole::Admin).unwrap_err();
        assert_eq!(err.error_type(), "NotFound");
    }

    #[test]
    fn test_remove_other_admin_allowed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut org = org_with(vec![a, b], vec![a, b]);

        // Removing B reduces admins to {A}: allowed.
        remove_member(&mut org, a, b).unwrap();
        assert_eq!(org.admins, vec![a]);
        assert_eq!(org.members, vec![a]);

        // Removing A (the last admin) is rejected.
        let c = Uuid::new_v4();
        org.members.push(c);
        let err = remove_member(&mut org, c, a).unwrap_err();
        assert_eq!(err.error_type(), "Conflict");
        assert_eq!(org.admins, vec![a]);
    }

    #[test]
    fn test_actor_cannot_remove_self() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut org = org_with(vec![a, b], vec![a, b]);

        let err = remove_member(&mut org, a, a).unwrap_err();
        assert_eq!(err.error_type(), "Conflict");
        assert!(org.is_member(a));
    }

    #[test]
    fn test_add_member_idempotent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut org = org_with(vec![a], vec![a]);

        assert!(add_member(&mut org, b));
        assert!(!add_member(&mut org, b));
        assert_eq!(org.members, vec![a, b]);
    }

    #[test]
    fn test_last_admin_invariant_over_operation_sequences() {
        // Run a mixed sequence of transitions; no state may ever leave the
        // organization without an admin.
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut org = org_with(vec![a], vec![a]);

        add_member(&mut org, b);
        add_member(&mut org, c);
        let _ = change_role(&mut org, b, OrgRole::Admin);
        assert!(org.admin_count() >= 1);
        let _ = change_role(&mut org, a, OrgRole::Member);
        assert!(org.admin_count() >= 1);
        let _ = change_role(&mut org, b, OrgRole::Member); // last admin, must fail
        assert!(org.admin_count() >= 1);
        let _ = remove_member(&mut org, a, b); // removing last admin, must fail
        assert!(org.admin_count() >= 1);
        assert_eq!(org.admins, vec![b]);
    }

    #[test]
    fn test_affiliated_user_cannot_be_approved() {
        let user = user_with(Some(Uuid::new_v4()), UserJoinStatus::None);
        let err = ensure_unaffiliated(&user).unwrap_err();
        assert_eq!(err.error_type(), "Conflict");

        let free = user_with(None, UserJoinStatus::None);
        assert!(ensure_unaffiliated(&free).is_ok());
    }

    #[test]
    fn test_at_most_one_pending_request() {
        let user = user_with(None, UserJoinStatus::None);
        assert!(ensure_may_request_join(&user, false).is_ok());

        // An existing pending request blocks a second one, whether it is
        // visible on the request table or on the user record.
        let err = ensure_may_request_join(&user, true).unwrap_err();
        assert_eq!(err.error_type(), "Conflict");
        let pending = user_with(None, UserJoinStatus::Pending);
        assert!(ensure_may_request_join(&pending, false).is_err());
    }

    #[test]
    fn test_affiliated_user_cannot_request_join() {
        let user = user_with(Some(Uuid::new_v4()), UserJoinStatus::None);
        assert!(ensure_may_request_join(&user, false).is_err());
    }

    #[test]
    fn test_ensure_admin() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let org = org_with(vec![a], vec![a, b]);

        assert!(ensure_admin(&org, a).is_ok());
        let err = ensure_admin(&org, b).unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");
    }
}
