use argon2::PasswordVerifier;
use axum::{body::to_bytes, http::StatusCode};
use pretty_assertions::assert_eq;
use rstest::rstest;
use studio_api::middleware::{
    auth,
    error_handling::{map_error, INTERNAL_ERROR_MESSAGE},
};
use studio_core::errors::StudioError;

#[rstest]
#[case(StudioError::NotFound("Class not found".to_string()), StatusCode::NOT_FOUND)]
#[case(StudioError::Validation("Invalid input".to_string()), StatusCode::BAD_REQUEST)]
#[case(StudioError::Authentication("Missing bearer token".to_string()), StatusCode::UNAUTHORIZED)]
#[case(StudioError::Authorization("Waiver not signed".to_string()), StatusCode::FORBIDDEN)]
#[case(StudioError::Conflict("Class is full".to_string()), StatusCode::CONFLICT)]
#[case(StudioError::InsufficientCredits("No usable package".to_string()), StatusCode::PAYMENT_REQUIRED)]
#[case(StudioError::Database(eyre::eyre!("connection reset")), StatusCode::INTERNAL_SERVER_ERROR)]
#[case(
    StudioError::Internal(Box::new(std::io::Error::new(std::io::ErrorKind::Other, "boom"))),
    StatusCode::INTERNAL_SERVER_ERROR
)]
fn test_error_status_mapping(#[case] error: StudioError, #[case] expected: StatusCode) {
    let response = map_error(error);
    assert_eq!(response.status(), expected);
}

#[tokio::test]
async fn test_error_body_carries_message() {
    let response = map_error(StudioError::Conflict("Class is full".to_string()));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["error"], "Conflict: Class is full");
}

#[rstest]
#[case(StudioError::Database(
    eyre::eyre!("password authentication failed for user \"studio\"").wrap_err("Failed to load class")
))]
#[case(StudioError::Internal(Box::new(std::io::Error::new(
    std::io::ErrorKind::Other,
    "/var/lib/studio/secret.key missing"
))))]
#[tokio::test]
async fn test_server_error_body_hides_details(#[case] error: StudioError) {
    let response = map_error(error);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["error"], INTERNAL_ERROR_MESSAGE);
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains("password"));
    assert!(!text.contains("secret.key"));
}

#[test]
fn test_hash_password_round_trip() {
    let hashed = auth::hash_password("correct horse").unwrap();
    assert!(hashed.starts_with("$argon2"));
    assert_ne!(hashed, "correct horse");

    let parsed = argon2::PasswordHash::new(&hashed).unwrap();
    let argon2 = argon2::Argon2::default();
    assert!(argon2.verify_password(b"correct horse", &parsed).is_ok());
    assert!(argon2.verify_password(b"wrong horse", &parsed).is_err());
}

#[test]
fn test_hashes_are_salted() {
    let first = auth::hash_password("same password").unwrap();
    let second = auth::hash_password("same password").unwrap();
    assert_ne!(first, second);
}
