use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::booking::BookingStatus;

/// What external collaborators (calendar, email) are told about a booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub class_id: Uuid,
    pub class_name: String,
    pub instructor: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Calendar event created for this booking earlier, if any
    pub google_calendar_event_id: Option<String>,
}

/// Outbound notifications for booking changes.
///
/// Called after the booking transaction commits; failures never undo a booking.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    /// Returns the external calendar event id when one was created
    async fn booking_confirmed(&self, event: &BookingEvent) -> eyre::Result<Option<String>>;

    async fn booking_cancelled(&self, event: &BookingEvent) -> eyre::Result<()>;
}
