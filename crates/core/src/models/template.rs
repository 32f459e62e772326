use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{StudioError, StudioResult};
use crate::settings::StudioSettings;

pub const DEFAULT_CLASS_TYPE: &str = "personal_training";

/// Day of the week as stored by the studio.
///
/// The numeric form counts from Sunday (`0`) to Saturday (`6`), which is what
/// the `days_of_week` column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        Self::ALL[weekday.num_days_from_sunday() as usize]
    }
}

/// Start and end time for one day of a recurring pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTimes {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Per-day time overrides, keyed by weekday name in JSON (`{"wednesday": {...}}`)
pub type DailySchedule = BTreeMap<DayOfWeek, DayTimes>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub class_type: String,
    pub days_of_week: Vec<DayOfWeek>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub daily_schedule: Option<DailySchedule>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub max_participants: i32,
    pub price_cents: i32,
    pub credits_required: i32,
    pub waitlist_enabled: bool,
    pub waitlist_capacity: i32,
    pub cancellation_deadline_hours: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl RecurringTemplate {
    /// Times used on `day`: the override when one exists, otherwise the template default.
    pub fn times_for(&self, day: DayOfWeek) -> DayTimes {
        self.daily_schedule
            .as_ref()
            .and_then(|schedule| schedule.get(&day).copied())
            .unwrap_or(DayTimes {
                start_time: self.start_time,
                end_time: self.end_time,
            })
    }

    pub fn runs_on(&self, day: DayOfWeek) -> bool {
        self.days_of_week.contains(&day)
    }

    /// Applies the present fields of `update`. The caller re-validates the result.
    pub fn apply_update(&mut self, update: UpdateTemplateRequest) {
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
        if let Some(mut days) = update.days_of_week {
            days.sort();
            days.dedup();
            self.days_of_week = days;
        }
        if let Some(start_time) = update.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = update.end_time {
            self.end_time = end_time;
        }
        if let Some(daily_schedule) = update.daily_schedule {
            // An empty map clears the overrides
            self.daily_schedule = (!daily_schedule.is_empty()).then_some(daily_schedule);
        }
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.end_date = Some(end_date);
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
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
    }

    pub fn validate(&self) -> StudioResult<()> {
        if self.name.trim().is_empty() {
            return Err(StudioError::Validation("Template name is required".to_string()));
        }
        if self.days_of_week.is_empty() {
            return Err(StudioError::Validation(
                "At least one day of the week is required".to_string(),
            ));
        }
        validate_times(self.start_time, self.end_time)?;

        if let Some(schedule) = &self.daily_schedule {
            for (day, times) in schedule {
                if !self.runs_on(*day) {
                    return Err(StudioError::Validation(format!(
                        "Schedule override for {:?} but the template does not run that day",
                        day
                    )));
                }
                validate_times(times.start_time, times.end_time)?;
            }
        }

        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                return Err(StudioError::Validation(
                    "end_date must not be before start_date".to_string(),
                ));
            }
        }

        validate_class_rules(
            self.max_participants,
            self.price_cents,
            self.credits_required,
            self.waitlist_capacity,
            self.cancellation_deadline_hours,
        )
    }
}

pub(crate) fn validate_times(start: NaiveTime, end: NaiveTime) -> StudioResult<()> {
    if start >= end {
        return Err(StudioError::Validation(format!(
            "start_time {} must be before end_time {}",
            start, end
        )));
    }
    Ok(())
}

pub(crate) fn validate_class_rules(
    max_participants: i32,
    price_cents: i32,
    credits_required: i32,
    waitlist_capacity: i32,
    cancellation_deadline_hours: i32,
) -> StudioResult<()> {
    if max_participants < 1 {
        return Err(StudioError::Validation(
            "max_participants must be at least 1".to_string(),
        ));
    }
    if price_cents < 0 || credits_required < 0 || waitlist_capacity < 0 {
        return Err(StudioError::Validation(
            "price, credits and waitlist capacity cannot be negative".to_string(),
        ));
    }
    if cancellation_deadline_hours < 0 {
        return Err(StudioError::Validation(
            "cancellation_deadline_hours cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub class_type: Option<String>,
    pub days_of_week: Vec<DayOfWeek>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub daily_schedule: Option<DailySchedule>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub max_participants: Option<i32>,
    pub price_cents: Option<i32>,
    pub credits_required: Option<i32>,
    pub waitlist_enabled: Option<bool>,
    pub waitlist_capacity: Option<i32>,
    pub cancellation_deadline_hours: Option<i32>,
}

impl CreateTemplateRequest {
    /// Builds a validated template, filling unset business rules from `settings`.
    pub fn into_template(self, settings: &StudioSettings) -> StudioResult<RecurringTemplate> {
        let mut days_of_week = self.days_of_week;
        days_of_week.sort();
        days_of_week.dedup();

        let template = RecurringTemplate {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            description: self.description,
            instructor: self.instructor,
            class_type: self.class_type.unwrap_or_else(|| DEFAULT_CLASS_TYPE.to_string()),
            days_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            daily_schedule: self.daily_schedule.filter(|schedule| !schedule.is_empty()),
            start_date: self.start_date,
            end_date: self.end_date,
            max_participants: self
                .max_participants
                .unwrap_or(settings.default_max_participants),
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

        template.validate()?;
        Ok(template)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub class_type: Option<String>,
    pub days_of_week: Option<Vec<DayOfWeek>>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub daily_schedule: Option<DailySchedule>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_participants: Option<i32>,
    pub price_cents: Option<i32>,
    pub credits_required: Option<i32>,
    pub waitlist_enabled: Option<bool>,
    pub waitlist_capacity: Option<i32>,
    pub cancellation_deadline_hours: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateClassesRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateClassesResponse {
    pub template_id: Uuid,
    pub created: usize,
    pub skipped: usize,
    pub classes: Vec<super::class::Class>,
}
