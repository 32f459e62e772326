//! # Error Handling Middleware
//!
//! Maps [`StudioError`] to HTTP status codes and a `{"error": message}` JSON
//! body so every endpoint reports failures the same way. Server-side failures
//! answer with [`INTERNAL_ERROR_MESSAGE`] instead of their message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use studio_core::errors::StudioError;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use studio_api::middleware::error_handling::AppError;
/// use studio_core::errors::StudioError;
///
/// async fn handler(full: bool) -> Result<Json<&'static str>, AppError> {
///     if full {
///         return Err(AppError(StudioError::Conflict("Class is full".to_string())));
///     }
///     Ok(Json("booked"))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub StudioError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            StudioError::NotFound(_) => StatusCode::NOT_FOUND,
            StudioError::Validation(_) => StatusCode::BAD_REQUEST,
            StudioError::Authentication(_) => StatusCode::UNAUTHORIZED,
            StudioError::Authorization(_) => StatusCode::FORBIDDEN,
            StudioError::Conflict(_) => StatusCode::CONFLICT,
            StudioError::InsufficientCredits(_) => StatusCode::PAYMENT_REQUIRED,
            StudioError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StudioError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self.0);
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.0.to_string()
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Lets handlers use `?` on functions returning `StudioResult`
impl From<StudioError> for AppError {
    fn from(err: StudioError) -> Self {
        AppError(err)
    }
}

/// Plumbing failures from the repositories surface as database errors
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(StudioError::Database(err))
    }
}

pub fn map_error(err: StudioError) -> Response {
    AppError(err).into_response()
}
