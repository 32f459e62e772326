use std::error::Error;
use studio_core::errors::{StudioError, StudioResult};

#[test]
fn test_studio_error_display() {
    let not_found = StudioError::NotFound("Class not found".to_string());
    let validation = StudioError::Validation("Invalid input".to_string());
    let authentication = StudioError::Authentication("Invalid password".to_string());
    let authorization = StudioError::Authorization("Not authorized".to_string());
    let conflict = StudioError::Conflict("Class is full".to_string());
    let credits = StudioError::InsufficientCredits("No usable package".to_string());
    let database = StudioError::Database(eyre::eyre!("Database connection failed"));
    let internal = StudioError::Internal(Box::new(std::io::Error::new(
        std::io::ErrorKind::Other,
        "Internal error",
    )));

    assert_eq!(not_found.to_string(), "Resource not found: Class not found");
    assert_eq!(validation.to_string(), "Validation error: Invalid input");
    assert_eq!(
        authentication.to_string(),
        "Authentication error: Invalid password"
    );
    assert_eq!(
        authorization.to_string(),
        "Authorization error: Not authorized"
    );
    assert_eq!(conflict.to_string(), "Conflict: Class is full");
    assert_eq!(
        credits.to_string(),
        "Insufficient credits: No usable package"
    );
    assert!(database.to_string().contains("Database error:"));
    assert!(internal.to_string().contains("Internal server error:"));
}

#[test]
fn test_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "IO error");
    let studio_error = StudioError::Internal(Box::new(io_error));

    assert!(studio_error.source().is_some());
}

#[test]
fn test_studio_result() {
    let result: StudioResult<i32> = Ok(42);
    assert_eq!(result.unwrap(), 42);

    let result: StudioResult<i32> = Err(StudioError::NotFound("Not found".to_string()));
    assert!(result.is_err());
}

#[test]
fn test_from_eyre_report() {
    let studio_error: StudioError = eyre::eyre!("connection reset").into();

    assert!(matches!(studio_error, StudioError::Database(_)));
    assert!(studio_error.to_string().contains("connection reset"));
}
