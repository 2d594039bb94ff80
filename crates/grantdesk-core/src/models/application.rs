use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Application lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "application_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    InReview,
    Approved,
    Rejected,
}

/// One answer, keyed to a question id in the grant's schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct AnswerEntry {
    pub question_id: Uuid,
    pub value: String,
}

/// Per-grant, per-applicant submission. `grant_maker_id` is denormalized from
/// the grant so a maker's inbox can be listed without a join.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Application {
    pub id: Uuid,
    pub grant_id: Uuid,
    pub applicant_id: Uuid,
    pub grant_maker_id: Uuid,
    pub answers: serde_json::Value,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
