use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{StudioError, StudioResult};

/// Client or admin account, including onboarding and waiver state.
///
/// The stored waiver document is never serialized here; admins fetch it
/// through its own endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub is_admin: bool,
    pub onboarding_completed: bool,
    pub waiver_signature: Option<String>,
    pub waiver_signed_date: Option<DateTime<Utc>>,
    pub has_waiver_document: bool,
    pub weightlifting_classes_booked: i32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_signed_waiver(&self) -> bool {
        self.waiver_signature.is_some() && self.waiver_signed_date.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password: Option<String>,
}

impl RegisterUserRequest {
    pub fn validate(&self) -> StudioResult<()> {
        let email = self.email.trim();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(StudioError::Validation(format!("Invalid email address: {}", email)));
        }
        if self.name.trim().is_empty() {
            return Err(StudioError::Validation("Name is required".to_string()));
        }
        if let Some(password) = &self.password {
            if password.len() < 8 {
                return Err(StudioError::Validation(
                    "Password must be at least 8 characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaiverSubmissionRequest {
    pub signature: String,
    pub signed_date: Option<DateTime<Utc>>,
    /// Signed waiver PDF, base64 encoded
    pub pdf_base64: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub is_admin: Option<bool>,
}
