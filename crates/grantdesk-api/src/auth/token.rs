//! JWT issuing and verification (HS256).

use crate::auth::models::JwtClaims;
use chrono::{Duration, Utc};
use grantdesk_core::models::UserRole;
use grantdesk_core::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: UserRole,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        role,
        exp: (now + Duration::hours(expiry_hours)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

pub fn decode_token(secret: &str, token: &str) -> Result<JwtClaims, AppError> {
    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token has expired".to_string())
        }
        _ => AppError::Unauthorized("Invalid token".to_string()),
    })?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-0123";

    #[test]
    fn test_issued_token_decodes_with_same_secret() {
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id, UserRole::GrantMaker, 24).unwrap();
        let claims = decode_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, UserRole::GrantMaker);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(SECRET, Uuid::new_v4(), UserRole::Applicant, 24).unwrap();
        let err = decode_token("another-secret-entirely-456789012345", &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = issue_token(SECRET, Uuid::new_v4(), UserRole::Applicant, -1).unwrap();
        let err = decode_token(SECRET, &token).unwrap_err();
        match err {
            AppError::Unauthorized(msg) => assert!(msg.contains("expired")),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(decode_token(SECRET, "not.a.token").is_err());
    }
}
