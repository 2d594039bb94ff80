use crate::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Grant lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "grant_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Draft,
    Published,
    Closed,
}

/// One entry of a grant's dynamic question schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct GrantQuestion {
    pub id: Uuid,
    pub prompt: String,
    #[serde(default)]
    pub required: bool,
}

/// Funding opportunity owned by a grant maker. Questions are stored as a
/// JSONB array; answers in applications reference question ids.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Grant {
    pub id: Uuid,
    pub grant_maker_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub questions: serde_json::Value,
    pub status: GrantStatus,
    pub reviewers: Vec<Uuid>,
    pub approvers: Vec<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grant {
    /// Decode the JSONB question schema into typed entries.
    pub fn question_schema(&self) -> Result<Vec<GrantQuestion>, AppError> {
        serde_json::from_value(self.questions.clone())
            .map_err(|e| AppError::Internal(format!("Malformed question schema: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_schema_roundtrip() {
        let questions = vec![
            GrantQuestion {
                id: Uuid::new_v4(),
                prompt: "Project summary".to_string(),
                required: true,
            },
            GrantQuestion {
                id: Uuid::new_v4(),
                prompt: "Budget breakdown".to_string(),
                required: false,
            },
        ];
        let grant = Grant {
            id: Uuid::new_v4(),
            grant_maker_id: Uuid::new_v4(),
            organization_id: None,
            title: "Community fund".to_string(),
            description: String::new(),
            questions: serde_json::to_value(&questions).unwrap(),
            status: GrantStatus::Draft,
            reviewers: vec![],
            approvers: vec![],
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(grant.question_schema().unwrap(), questions);
    }

    #[test]
    fn test_question_required_defaults_false() {
        let q: GrantQuestion = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "prompt": "Optional notes"
        }))
        .unwrap();
        assert!(!q.required);
    }
}
