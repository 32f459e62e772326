use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use studio_core::{
    capacity::{ParticipantDrift, WaitlistEntry},
    errors::StudioError,
    models::{
        booking::Booking,
        class::Class,
        package::{Package, Purchase, UserPackage},
        template::{DailySchedule, DayOfWeek, RecurringTemplate},
        user::User,
    },
};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: bool,
    pub onboarding_completed: bool,
    pub waiver_signature: Option<String>,
    pub waiver_signed_date: Option<DateTime<Utc>>,
    pub has_waiver_document: bool,
    pub weightlifting_classes_booked: i32,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            phone: row.phone,
            is_admin: row.is_admin,
            onboarding_completed: row.onboarding_completed,
            waiver_signature: row.waiver_signature,
            waiver_signed_date: row.waiver_signed_date,
            has_waiver_document: row.has_waiver_document,
            weightlifting_classes_booked: row.weightlifting_classes_booked,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub class_type: String,
    pub days_of_week: Vec<i32>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub daily_schedule: Option<Json<DailySchedule>>,
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

impl TryFrom<DbTemplate> for RecurringTemplate {
    type Error = StudioError;

    fn try_from(row: DbTemplate) -> Result<Self, Self::Error> {
        let days_of_week = row
            .days_of_week
            .iter()
            .map(|index| {
                DayOfWeek::from_index(*index).ok_or_else(|| {
                    StudioError::Validation(format!(
                        "Template {} has invalid weekday {}",
                        row.id, index
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecurringTemplate {
            id: row.id,
            name: row.name,
            description: row.description,
            instructor: row.instructor,
            class_type: row.class_type,
            days_of_week,
            start_time: row.start_time,
            end_time: row.end_time,
            daily_schedule: row.daily_schedule.map(|Json(schedule)| schedule),
            start_date: row.start_date,
            end_date: row.end_date,
            max_participants: row.max_participants,
            price_cents: row.price_cents,
            credits_required: row.credits_required,
            waitlist_enabled: row.waitlist_enabled,
            waitlist_capacity: row.waitlist_capacity,
            cancellation_deadline_hours: row.cancellation_deadline_hours,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbClass {
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

impl From<DbClass> for Class {
    fn from(row: DbClass) -> Self {
        Class {
            id: row.id,
            template_id: row.template_id,
            name: row.name,
            description: row.description,
            instructor: row.instructor,
            class_type: row.class_type,
            class_date: row.class_date,
            start_time: row.start_time,
            end_time: row.end_time,
            max_participants: row.max_participants,
            current_participants: row.current_participants,
            price_cents: row.price_cents,
            credits_required: row.credits_required,
            waitlist_enabled: row.waitlist_enabled,
            waitlist_capacity: row.waitlist_capacity,
            cancellation_deadline_hours: row.cancellation_deadline_hours,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBooking {
    pub id: Uuid,
    pub sequence: i64,
    pub user_id: Uuid,
    pub class_id: Uuid,
    pub status: String,
    pub user_package_id: Option<Uuid>,
    pub credits_used: i32,
    pub google_calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub promoted_at: Option<DateTime<Utc>>,
}

impl DbBooking {
    pub fn waitlist_entry(&self) -> WaitlistEntry {
        WaitlistEntry {
            booking_id: self.id,
            created_at: self.created_at,
            sequence: self.sequence,
        }
    }
}

impl TryFrom<DbBooking> for Booking {
    type Error = StudioError;

    fn try_from(row: DbBooking) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            class_id: row.class_id,
            status: row.status.parse()?,
            user_package_id: row.user_package_id,
            credits_used: row.credits_used,
            google_calendar_event_id: row.google_calendar_event_id,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
            promoted_at: row.promoted_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbParticipant {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPackage {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub sessions: i32,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DbPackage> for Package {
    fn from(row: DbPackage) -> Self {
        Package {
            id: row.id,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            sessions: row.sessions,
            duration_days: row.duration_days,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUserPackage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub purchase_id: Option<Uuid>,
    pub sessions_remaining: i32,
    pub purchase_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<DbUserPackage> for UserPackage {
    fn from(row: DbUserPackage) -> Self {
        UserPackage {
            id: row.id,
            user_id: row.user_id,
            package_id: row.package_id,
            purchase_id: row.purchase_id,
            sessions_remaining: row.sessions_remaining,
            purchase_date: row.purchase_date,
            expiry_date: row.expiry_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPurchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub amount_cents: i32,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbPurchase> for Purchase {
    fn from(row: DbPurchase) -> Self {
        Purchase {
            id: row.id,
            user_id: row.user_id,
            package_id: row.package_id,
            amount_cents: row.amount_cents,
            payment_reference: row.payment_reference,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbParticipantDrift {
    pub class_id: Uuid,
    pub recorded: i32,
    pub actual: i64,
    pub max_participants: i32,
}

impl From<DbParticipantDrift> for ParticipantDrift {
    fn from(row: DbParticipantDrift) -> Self {
        ParticipantDrift {
            class_id: row.class_id,
            recorded: row.recorded,
            actual: i32::try_from(row.actual).unwrap_or(i32::MAX),
            max_participants: row.max_participants,
            promoted: 0,
        }
    }
}
