use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::template::{validate_class_rules, validate_times, DEFAULT_CLASS_TYPE};
use crate::{
    errors::{StudioError, StudioResult},
    scheduling,
    settings::StudioSettings,
};

/// A single dated, timed session, either materialized from a template or created standalone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: Uuid,
    pub template_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub class_type: String,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_participants: i32,
    pub current_participants: i32,
    pub price_cents: i32,
    pub credits_required: i32,
    pub waitlist_enabled: bool,
    pub waitlist_capacity: i32,
    pub cancellation_deadline_hours: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Class {
    pub fn spots_left(&self) -> i32 {
        (self.max_participants - self.current_participants).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    pub fn starts_at(&self, timezone: Tz) -> DateTime<Utc> {
        scheduling::local_to_utc(self.class_date, self.start_time, timezone)
    }

    pub fn is_weightlifting(&self) -> bool {
        self.class_type.eq_ignore_ascii_case("weightlifting")
    }

    pub fn apply_update(&mut self, update: UpdateClassRequest) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(instructor) = update.instructor {
            self.instructor = Some(instructor);
        }
        if let Some(class_type) = update.class_type {
            self.class_type = class_type;
        }
        if let Some(class_date) = update.class_date {
            self.class_date = class_date;
        }
        if let Some(start_time) = update.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = update.end_time {
            self.end_time = end_time;
        }
        if let Some(max_participants) = update.max_participants {
            self.max_participants = max_participants;
        }
        if let Some(price_cents) = update.price_cents {
            self.price_cents = price_cents;
        }
        if let Some(credits_required) = update.credits_required {
            self.credits_required = credits_required;
        }
        if let Some(waitlist_enabled) = update.waitlist_enabled {
            self.waitlist_enabled = waitlist_enabled;
        }
        if let Some(waitlist_capacity) = update.waitlist_capacity {
            self.waitlist_capacity = waitlist_capacity;
        }
        if let Some(hours) = update.cancellation_deadline_hours {
            self.cancellation_deadline_hours = hours;
        }
    }

    pub fn validate(&self) -> StudioResult<()> {
        if self.name.trim().is_empty() {
            return Err(StudioError::Validation("Class name is required".to_string()));
        }
        validate_times(self.start_time, self.end_time)?;
        validate_class_rules(
            self.max_participants,
            self.price_cents,
            self.credits_required,
            self.waitlist_capacity,
            self.cancellation_deadline_hours,
        )?;
        if self.current_participants > self.max_participants {
            return Err(StudioError::Validation(format!(
                "max_participants {} is below the {} participants already booked",
                self.max_participants, self.current_participants
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClassRequest {
    pub name: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub class_type: Option<String>,
    pub class_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_participants: Option<i32>,
    pub price_cents: Option<i32>,
    pub credits_required: Option<i32>,
    pub waitlist_enabled: Option<bool>,
    pub waitlist_capacity: Option<i32>,
    pub cancellation_deadline_hours: Option<i32>,
}

impl CreateClassRequest {
    /// Builds a validated standalone class, filling unset business rules from `settings`.
    pub fn into_class(self, settings: &StudioSettings) -> StudioResult<Class> {
        let class = Class {
            id: Uuid::new_v4(),
            template_id: None,
            name: self.name.trim().to_string(),
            description: self.description,
            instructor: self.instructor,
            class_type: self.class_type.unwrap_or_else(|| DEFAULT_CLASS_TYPE.to_string()),
            class_date: self.class_date,
            start_time: self.start_time,
            end_time: self.end_time,
            max_participants: self
                .max_participants
                .unwrap_or(settings.default_max_participants),
            current_participants: 0,
            price_cents: self.price_cents.unwrap_or(0),
            credits_required: self.credits_required.unwrap_or(1),
            waitlist_enabled: self.waitlist_enabled.unwrap_or(true),
            waitlist_capacity: self
                .waitlist_capacity
                .unwrap_or(settings.default_waitlist_capacity),
            cancellation_deadline_hours: self
                .cancellation_deadline_hours
                .unwrap_or(settings.default_cancellation_deadline_hours),
            is_active: true,
            created_at: Utc::now(),
        };

        class.validate()?;
        Ok(class)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClassRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub class_type: Option<String>,
    pub class_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub max_participants: Option<i32>,
    pub price_cents: Option<i32>,
    pub credits_required: Option<i32>,
    pub waitlist_enabled: Option<bool>,
    pub waitlist_capacity: Option<i32>,
    pub cancellation_deadline_hours: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// One row of a class roster as shown to admins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassParticipant {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub status: super::booking::BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateClassResponse {
    pub class: Class,
    pub promoted_bookings: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateClassResponse {
    pub class_id: Uuid,
    pub cancelled_bookings: usize,
    pub refunded_credits: i32,
}
