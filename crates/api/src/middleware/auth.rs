//! # Authentication Module
//!
//! Password hashing for client accounts and the bearer-token guard in front
//! of the admin endpoints.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use eyre::Result;
use std::sync::Arc;
use studio_core::errors::StudioError;
use studio_db::models::DbUser;

use crate::{middleware::error_handling::AppError, ApiState};

/// Hashes a password with Argon2 and a fresh random salt.
///
/// Returns the PHC string (algorithm, parameters, salt and hash), ready to store.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre::eyre!("Error hashing password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Looks up a user by email and checks the password. `None` means the
/// credentials were wrong.
pub async fn verify_login(pool: &sqlx::PgPool, email: &str, password: &str) -> Result<Option<DbUser>> {
    studio_db::repositories::user::verify_password(pool, email, password).await
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Compares without short-circuiting on the first differing byte
fn tokens_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Rejects requests without the configured admin bearer token.
///
/// When no `ADMIN_TOKEN` is configured every admin request is refused.
pub async fn require_admin(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.admin_token.as_deref() else {
        tracing::warn!("Admin request to {} refused: ADMIN_TOKEN is not configured", request.uri());
        return Err(AppError(StudioError::Authorization(
            "Admin access is disabled".to_string(),
        )));
    };

    let given = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| StudioError::Authentication("Missing bearer token".to_string()))?;

    if !tokens_match(given, expected) {
        tracing::warn!("Admin request to {} with an invalid token", request.uri());
        return Err(AppError(StudioError::Authorization(
            "Invalid admin token".to_string(),
        )));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("bearer  abc123 "), Some("abc123"));
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc123"), None);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("secret", "secret"));
        assert!(!tokens_match("secret", "secreT"));
        assert!(!tokens_match("secret", "secret-but-longer"));
    }
}
