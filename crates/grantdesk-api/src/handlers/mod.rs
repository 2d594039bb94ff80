pub mod applications;
pub mod audit_logs;
pub mod auth;
pub mod grants;
pub mod join_requests;
pub mod members;
pub mod notifications;
pub mod organizations;
pub mod users;
