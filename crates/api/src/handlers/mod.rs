pub mod bookings;
pub mod classes;
pub mod maintenance;
pub mod packages;
pub mod templates;
pub mod users;

use crate::middleware::error_handling::INTERNAL_ERROR_MESSAGE;
use axum::{http::StatusCode, BoxError, Json};
use serde_json::{json, Value};

/// Turns errors from the tower middleware stack (timeouts) into JSON responses
pub async fn handle_timeout(err: BoxError) -> (StatusCode, Json<Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "error": "Request timed out" })),
        )
    } else {
        tracing::error!("Unhandled middleware error: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": INTERNAL_ERROR_MESSAGE })),
        )
    }
}
