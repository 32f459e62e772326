use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use studio_core::{
    errors::StudioError,
    models::booking::{
        AddParticipantRequest, Booking, BookingResponse, BookingStatus, CancelBookingRequest,
        CancellationResponse, CreateBookingRequest,
    },
};
use studio_db::repositories::booking::{self as booking_repo, BookingOutcome, BookingPolicy, CancellationOutcome};
use uuid::Uuid;

use crate::{
    middleware::error_handling::AppError,
    notifications::{booking_event, spawn_notices, Notice},
    ApiState,
};

fn announce_booking(state: &Arc<ApiState>, outcome: &BookingOutcome) {
    if outcome.booking.status == BookingStatus::Confirmed {
        let event = booking_event(state, &outcome.booking, &outcome.class, &outcome.user);
        spawn_notices(state, vec![Notice::Confirmed(event)]);
    }
}

fn announce_cancellation(state: &Arc<ApiState>, outcome: &CancellationOutcome) {
    let mut notices = vec![Notice::Cancelled(booking_event(
        state,
        &outcome.booking,
        &outcome.class,
        &outcome.user,
    ))];
    notices.extend(outcome.promoted.iter().map(|promoted| {
        Notice::Confirmed(booking_event(state, &promoted.booking, &outcome.class, &promoted.user))
    }));

    spawn_notices(state, notices);
}

fn booking_response(outcome: BookingOutcome) -> BookingResponse {
    BookingResponse {
        booking: outcome.booking,
        waitlist_position: outcome.waitlist_position,
    }
}

fn cancellation_response(outcome: CancellationOutcome) -> CancellationResponse {
    CancellationResponse {
        booking: outcome.booking,
        refunded_credits: outcome.refunded_credits,
        promoted_booking: outcome.promoted.into_iter().next().map(|promoted| promoted.booking),
    }
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let outcome = booking_repo::create_booking(
        &state.db_pool,
        payload.user_id,
        payload.class_id,
        BookingPolicy::for_client(&state.settings),
    )
    .await?;

    announce_booking(&state, &outcome);
    Ok((StatusCode::CREATED, Json(booking_response(outcome))))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = booking_repo::get_booking(&state.db_pool, id)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::NotFound(format!("Booking with ID {} not found", id)))?;

    Ok(Json(Booking::try_from(booking)?))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelBookingRequest>,
) -> Result<Json<CancellationResponse>, AppError> {
    let outcome = booking_repo::cancel_booking(
        &state.db_pool,
        id,
        Some(payload.user_id),
        BookingPolicy::for_client(&state.settings),
    )
    .await?;

    announce_cancellation(&state, &outcome);
    Ok(Json(cancellation_response(outcome)))
}

#[axum::debug_handler]
pub async fn list_user_bookings(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = booking_repo::list_user_bookings(&state.db_pool, user_id)
        .await
        .map_err(StudioError::Database)?;

    let bookings = bookings
        .into_iter()
        .map(Booking::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(bookings))
}

/// Admin: books a client into a class, bypassing the waiver check and, when
/// `charge_credits` is false, the credit charge.
#[axum::debug_handler]
pub async fn add_participant(
    State(state): State<Arc<ApiState>>,
    Path(class_id): Path<Uuid>,
    Json(payload): Json<AddParticipantRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let policy = BookingPolicy::for_admin(&state.settings, payload.charge_credits.unwrap_or(true));

    let outcome = booking_repo::create_booking(&state.db_pool, payload.user_id, class_id, policy).await?;

    tracing::info!("Admin added user {} to class {}", payload.user_id, class_id);
    announce_booking(&state, &outcome);
    Ok((StatusCode::CREATED, Json(booking_response(outcome))))
}

/// Admin: removes a participant. Credits are always refunded.
#[axum::debug_handler]
pub async fn remove_participant(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancellationResponse>, AppError> {
    let outcome = booking_repo::cancel_booking(
        &state.db_pool,
        id,
        None,
        BookingPolicy::for_admin(&state.settings, false),
    )
    .await?;

    announce_cancellation(&state, &outcome);
    Ok(Json(cancellation_response(outcome)))
}
