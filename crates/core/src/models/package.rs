use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{StudioError, StudioResult};

/// A purchasable bundle of session credits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub sessions: i32,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPackage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub purchase_id: Option<Uuid>,
    pub sessions_remaining: i32,
    pub purchase_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserPackage {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub amount_cents: i32,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackageRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub sessions: i32,
    pub duration_days: i32,
}

impl CreatePackageRequest {
    pub fn validate(&self) -> StudioResult<()> {
        validate_package(&self.name, self.price_cents, self.sessions, self.duration_days)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePackageRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i32>,
    pub sessions: Option<i32>,
    pub duration_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl Package {
    pub fn apply_update(&mut self, update: UpdatePackageRequest) -> StudioResult<()> {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(price_cents) = update.price_cents {
            self.price_cents = price_cents;
        }
        if let Some(sessions) = update.sessions {
            self.sessions = sessions;
        }
        if let Some(duration_days) = update.duration_days {
            self.duration_days = duration_days;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        validate_package(&self.name, self.price_cents, self.sessions, self.duration_days)
    }
}

fn validate_package(name: &str, price_cents: i32, sessions: i32, duration_days: i32) -> StudioResult<()> {
    if name.trim().is_empty() {
        return Err(StudioError::Validation("Package name is required".to_string()));
    }
    if price_cents < 0 {
        return Err(StudioError::Validation("price_cents cannot be negative".to_string()));
    }
    if sessions < 1 {
        return Err(StudioError::Validation(
            "A package must contain at least one session".to_string(),
        ));
    }
    if duration_days < 1 || i64::from(duration_days) > crate::ledger::MAX_PACKAGE_DAYS {
        return Err(StudioError::Validation(format!(
            "duration_days must be between 1 and {}",
            crate::ledger::MAX_PACKAGE_DAYS
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasePackageRequest {
    pub user_id: Uuid,
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub purchase: Purchase,
    pub user_package: UserPackage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendPackageRequest {
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditBalance {
    pub user_id: Uuid,
    pub sessions_remaining: i64,
    pub next_expiry: Option<DateTime<Utc>>,
    pub packages: Vec<UserPackage>,
}
