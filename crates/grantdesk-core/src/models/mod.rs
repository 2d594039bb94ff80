//! Domain models shared across crates.

pub mod application;
pub mod audit;
pub mod grant;
pub mod join_request;
pub mod notification;
pub mod organization;
pub mod user;

pub use application::{AnswerEntry, Application, ApplicationStatus};
pub use audit::{AuditAction, AuditFilter, AuditLog};
pub use grant::{Grant, GrantQuestion, GrantStatus};
pub use join_request::{JoinRequest, JoinRequestStatus};
pub use notification::Notification;
pub use organization::{Organization, OrganizationSummary};
pub use user::{OrgRole, User, UserJoinStatus, UserRole, VerificationStatus};
