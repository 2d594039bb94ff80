//! Security audit logging
//!
//! Structured log events for security-relevant activity, emitted under the
//! `audit` tracing target so they can be routed separately from application
//! logs. The durable audit trail lives in the `audit_logs` table; these events
//! cover authentication, which never reaches the database layer.

use uuid::Uuid;

/// Log an authentication attempt (success or failure).
pub fn log_authentication_attempt(user_id: Option<Uuid>, success: bool, reason: Option<&str>) {
    if success {
        tracing::info!(
            target: "audit",
            event = "authentication_attempt",
            user_id = ?user_id,
            success = true,
        );
    } else {
        tracing::warn!(
            target: "audit",
            event = "authentication_attempt",
            user_id = ?user_id,
            success = false,
            reason = reason.unwrap_or("unknown"),
        );
    }
}
