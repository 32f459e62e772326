//! Booking notifications to external collaborators.
//!
//! Notifications are sent after the booking transaction has committed. A
//! failed notification is logged and never changes the outcome of the request.

use async_trait::async_trait;
use chrono::Duration;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::{sync::Arc, time::Duration as StdDuration};
use tokio::task::JoinHandle;
use studio_core::{
    models::{booking::Booking, class::Class, user::User},
    notify::{BookingEvent, BookingNotifier},
};

use crate::ApiState;

/// Default notifier: records booking changes in the log only
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

#[async_trait]
impl BookingNotifier for LoggingNotifier {
    async fn booking_confirmed(&self, event: &BookingEvent) -> Result<Option<String>> {
        tracing::info!(
            "Booking {} confirmed: {} <{}> in {} at {}",
            event.booking_id,
            event.user_name,
            event.user_email,
            event.class_name,
            event.starts_at
        );
        Ok(None)
    }

    async fn booking_cancelled(&self, event: &BookingEvent) -> Result<()> {
        tracing::info!(
            "Booking {} cancelled: {} <{}> in {} at {}",
            event.booking_id,
            event.user_name,
            event.user_email,
            event.class_name,
            event.starts_at
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    event_id: Option<String>,
}

/// Posts booking events as JSON to a calendar integration endpoint.
///
/// Confirmations go to `<url>/confirmed`, cancellations to `<url>/cancelled`.
/// A confirmation reply of `{"event_id": "..."}` is stored on the booking.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// `timeout` bounds each webhook call, connection included.
    pub fn new(url: impl Into<String>, timeout: StdDuration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build calendar webhook client")?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, action: &str, event: &BookingEvent) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{}", self.url, action))
            .json(event)
            .send()
            .await
            .wrap_err_with(|| format!("Calendar webhook unreachable for booking {}", event.booking_id))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(eyre::eyre!("Calendar webhook returned {}: {}", status, error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl BookingNotifier for WebhookNotifier {
    async fn booking_confirmed(&self, event: &BookingEvent) -> Result<Option<String>> {
        let response = self.post("confirmed", event).await?;
        let reply: WebhookReply = response
            .json()
            .await
            .wrap_err("Calendar webhook sent an unreadable reply")?;
        Ok(reply.event_id)
    }

    async fn booking_cancelled(&self, event: &BookingEvent) -> Result<()> {
        self.post("cancelled", event).await?;
        Ok(())
    }
}

pub fn booking_event(state: &ApiState, booking: &Booking, class: &Class, user: &User) -> BookingEvent {
    let timezone = state.settings.tz();
    let starts_at = class.starts_at(timezone);
    let ends_at = starts_at + (class.end_time - class.start_time).max(Duration::zero());

    BookingEvent {
        booking_id: booking.id,
        status: booking.status,
        user_id: user.id,
        user_email: user.email.clone(),
        user_name: user.name.clone(),
        class_id: class.id,
        class_name: class.name.clone(),
        instructor: class.instructor.clone(),
        starts_at,
        ends_at,
        google_calendar_event_id: booking.google_calendar_event_id.clone(),
    }
}

/// Tells the notifier about a confirmed booking and stores the calendar event id it returns.
pub async fn notify_confirmed(state: &Arc<ApiState>, event: BookingEvent) {
    match state.notifier.booking_confirmed(&event).await {
        Ok(Some(event_id)) => {
            if let Err(e) = studio_db::repositories::booking::set_calendar_event_id(
                &state.db_pool,
                event.booking_id,
                &event_id,
            )
            .await
            {
                tracing::warn!(
                    "Could not store calendar event {} for booking {}: {:?}",
                    event_id,
                    event.booking_id,
                    e
                );
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(
            "Confirmation notice for booking {} failed: {:?}",
            event.booking_id,
            e
        ),
    }
}

pub async fn notify_cancelled(state: &Arc<ApiState>, event: BookingEvent) {
    if let Err(e) = state.notifier.booking_cancelled(&event).await {
        tracing::warn!(
            "Cancellation notice for booking {} failed: {:?}",
            event.booking_id,
            e
        );
    }
}

/// A booking change to tell the notifier about
#[derive(Debug, Clone)]
pub enum Notice {
    Confirmed(BookingEvent),
    Cancelled(BookingEvent),
}

/// Sends `notices` in order on a background task. Callers do not wait for delivery.
pub fn spawn_notices(state: &Arc<ApiState>, notices: Vec<Notice>) -> JoinHandle<()> {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        for notice in notices {
            match notice {
                Notice::Confirmed(event) => notify_confirmed(&state, event).await,
                Notice::Cancelled(event) => notify_cancelled(&state, event).await,
            }
        }
    })
}
