//! Application submission and review endpoints.

use crate::auth::models::AuthContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use grantdesk_core::models::{
    AnswerEntry, Application, ApplicationStatus, AuditAction, Grant, GrantStatus, UserRole,
};
use grantdesk_core::AppError;
use grantdesk_db::{NewAuditLog, TransactionGuard};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitApplicationRequest {
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
}

/// Every required question in the grant's schema must have a non-empty
/// answer, and every answer must reference a question that exists.
fn validate_answers(grant: &Grant, answers: &[AnswerEntry]) -> Result<(), AppError> {
    let questions = grant.question_schema()?;

    for answer in answers {
        if !questions.iter().any(|q| q.id == answer.question_id) {
            return Err(AppError::InvalidInput(format!(
                "Answer references unknown question {}",
                answer.question_id
            )));
        }
    }

    for question in questions.iter().filter(|q| q.required) {
        let answered = answers
            .iter()
            .any(|a| a.question_id == question.id && !a.value.trim().is_empty());
        if !answered {
            return Err(AppError::InvalidInput(format!(
                "Required question \"{}\" is unanswered",
                question.prompt
            )));
        }
    }

    Ok(())
}

#[utoipa::path(
    post,
    path = "/grants/{id}/applications",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Grant ID")),
    request_body = SubmitApplicationRequest,
    responses(
        (status = 200, description = "Application submitted", body = Application),
        (status = 403, description = "Caller is not a verified applicant", body = ErrorResponse),
        (status = 409, description = "Grant closed or already applied", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id(), grant_id = %grant_id))]
pub async fn submit_application(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(grant_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<SubmitApplicationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require_role(UserRole::Applicant)?;
    if !ctx.user.is_verified() {
        return Err(AppError::Forbidden(
            "Your account must be verified before applying".to_string(),
        )
        .into());
    }

    let grant = state
        .db
        .grant_repository
        .get_by_id(grant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Grant not found".to_string()))?;

    if grant.status != GrantStatus::Published {
        return Err(AppError::Conflict(
            "Grant is not open for applications".to_string(),
        )
        .into());
    }
    if let Some(deadline) = grant.deadline {
        if Utc::now() > deadline {
            return Err(AppError::Conflict(
                "The application deadline has passed".to_string(),
            )
            .into());
        }
    }
    validate_answers(&grant, &payload.answers)?;

    let answers = serde_json::to_value(&payload.answers).map_err(AppError::from)?;
    let application = state
        .db
        .application_repository
        .create(grant.id, ctx.user_id(), grant.grant_maker_id, &answers)
        .await?;

    state
        .db
        .audit_log_repository
        .append(&NewAuditLog {
            actor_id: Some(ctx.user_id()),
            actor_role: Some(ctx.role()),
            action: AuditAction::ApplicationSubmitted,
            entity_type: "application".to_string(),
            entity_id: Some(application.id),
            details: serde_json::json!({ "grant_id": grant.id }),
        })
        .await;

    Ok(Json(application))
}

#[utoipa::path(
    get,
    path = "/applications",
    tag = "applications",
    responses((status = 200, description = "Caller's own applications", body = [Application]))
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id()))]
pub async fn list_my_applications(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let applications = state
        .db
        .application_repository
        .list_for_applicant(ctx.user_id())
        .await?;
    Ok(Json(applications))
}

#[utoipa::path(
    get,
    path = "/grants/{id}/applications",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Grant ID")),
    responses(
        (status = 200, description = "Applications for the grant", body = [Application]),
        (status = 403, description = "Caller may not review this grant", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(user_id = %ctx.user_id(), grant_id = %grant_id))]
pub async fn list_grant_applications(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(grant_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let grant = state
        .db
        .grant_repository
        .get_by_id(grant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Grant not found".to_string()))?;

    let allowed = grant.grant_maker_id == ctx.user_id()
        || grant.reviewers.contains(&ctx.user_id())
        || grant.approvers.contains(&ctx.user_id())
        || ctx.is_super_admin();
    if !allowed {
        return Err(AppError::Forbidden(
            "You are not assigned to this grant".to_string(),
        )
        .into());
    }

    let applications = state
        .db
        .application_repository
        .list_for_grant(grant_id)
        .await?;
    Ok(Json(applications))
}

#[utoipa::path(
    put,
    path = "/applications/{id}/status",
    tag = "applications",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateApplicationStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Application),
        (status = 403, description = "Caller may not set this status", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %ctx.user_id(), application_id = %application_id))]
pub async fn update_application_status(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(application_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateApplicationStatusRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let application = state
        .db
        .application_repository
        .get_by_id(application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
    let grant = state
        .db
        .grant_repository
        .get_by_id(application.grant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Grant not found".to_string()))?;

    let is_owner = grant.grant_maker_id == ctx.user_id();
    let is_reviewer = grant.reviewers.contains(&ctx.user_id());
    let is_approver = grant.approvers.contains(&ctx.user_id());

    // Reviewers move applications into review; final decisions belong to
    // approvers, the owning grant maker, or a SuperAdmin.
    let allowed = match payload.status {
        ApplicationStatus::InReview => {
            is_owner || is_reviewer || is_approver || ctx.is_super_admin()
        }
        ApplicationStatus::Approved | ApplicationStatus::Rejected => {
            is_owner || is_approver || ctx.is_super_admin()
        }
        ApplicationStatus::Submitted => ctx.is_super_admin(),
    };
    if !allowed {
        return Err(AppError::Forbidden(
            "You may not set this application status".to_string(),
        )
        .into());
    }

    let updated = state
        .db
        .application_repository
        .update_status(application_id, payload.status)
        .await?;

    let mut tx = TransactionGuard::begin(&state.db.pool).await?;
    state
        .db
        .notification_repository
        .notify(
            &mut tx,
            application.applicant_id,
            &format!(
                "Your application for \"{}\" is now {:?}",
                grant.title, payload.status
            ),
        )
        .await?;
    state
        .db
        .audit_log_repository
        .append_tx(
            &mut tx,
            &NewAuditLog {
                actor_id: Some(ctx.user_id()),
                actor_role: Some(ctx.role()),
                action: AuditAction::ApplicationStatusChanged,
                entity_type: "application".to_string(),
                entity_id: Some(application_id),
                details: serde_json::json!({ "status": payload.status }),
            },
        )
        .await?;
    tx.commit().await?;

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn grant_with_questions(questions: serde_json::Value) -> Grant {
        Grant {
            id: Uuid::new_v4(),
            grant_maker_id: Uuid::new_v4(),
            organization_id: None,
            title: "Research grant".to_string(),
            description: "desc".to_string(),
            questions,
            status: GrantStatus::Published,
            reviewers: vec![],
            approvers: vec![],
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_required_answer_rejected() {
        let q_id = Uuid::new_v4();
        let grant = grant_with_questions(serde_json::json!([
            { "id": q_id, "prompt": "Why?", "required": true }
        ]));
        let err = validate_answers(&grant, &[]).unwrap_err();
        assert_eq!(err.error_type(), "InvalidInput");
    }

    #[test]
    fn test_blank_answer_does_not_satisfy_required_question() {
        let q_id = Uuid::new_v4();
        let grant = grant_with_questions(serde_json::json!([
            { "id": q_id, "prompt": "Why?", "required": true }
        ]));
        let answers = vec![AnswerEntry {
            question_id: q_id,
            value: "   ".to_string(),
        }];
        assert!(validate_answers(&grant, &answers).is_err());
    }

    #[test]
    fn test_unknown_question_id_rejected() {
        let grant = grant_with_questions(serde_json::json!([]));
        let answers = vec![AnswerEntry {
            question_id: Uuid::new_v4(),
            value: "answer".to_string(),
        }];
        assert!(validate_answers(&grant, &answers).is_err());
    }

    #[test]
    fn test_optional_questions_may_be_skipped() {
        let required = Uuid::new_v4();
        let optional = Uuid::new_v4();
        let grant = grant_with_questions(serde_json::json!([
            { "id": required, "prompt": "Why?", "required": true },
            { "id": optional, "prompt": "Anything else?", "required": false }
        ]));
        let answers = vec![AnswerEntry {
            question_id: required,
            value: "Because".to_string(),
        }];
        assert!(validate_answers(&grant, &answers).is_ok());
    }
}
