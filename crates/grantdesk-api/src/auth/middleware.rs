use crate::auth::models::AuthContext;
use crate::auth::token::decode_token;
use crate::error::HttpAppError;
use crate::middleware::audit;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use grantdesk_core::AppError;
use grantdesk_db::UserRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
    pub user_repository: UserRepository,
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            audit::log_authentication_attempt(None, false, Some("Missing authorization header"));
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        audit::log_authentication_attempt(None, false, Some("Invalid authorization header format"));
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    let claims = match decode_token(&auth_state.jwt_secret, token) {
        Ok(claims) => claims,
        Err(e) => {
            audit::log_authentication_attempt(None, false, Some(&e.to_string()));
            return HttpAppError(e).into_response();
        }
    };

    // The token carries only the id; load the current user so role and
    // organization changes since issuance take effect immediately.
    let user = match auth_state.user_repository.get_by_id(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            audit::log_authentication_attempt(Some(claims.sub), false, Some("Account no longer exists"));
            return HttpAppError(AppError::Unauthorized(
                "Account no longer exists".to_string(),
            ))
            .into_response();
        }
        Err(e) => return HttpAppError(e).into_response(),
    };

    if user.role != claims.role {
        audit::log_authentication_attempt(Some(user.id), false, Some("Token role mismatch"));
        return HttpAppError(AppError::Unauthorized("Invalid token".to_string())).into_response();
    }

    audit::log_authentication_attempt(Some(user.id), true, None);
    request.extensions_mut().insert(AuthContext { user });
    next.run(request).await
}
