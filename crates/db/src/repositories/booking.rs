//! Booking transactions.
//!
//! Every mutation runs in one transaction and takes row locks in a fixed order:
//! the class row, then its booking rows, then the user packages being charged or
//! refunded. Two requests racing for the last seat therefore serialize on the
//! class row.

use crate::{
    is_unique_violation,
    models::{DbBooking, DbClass},
    repositories::{class, package, user},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use eyre::{Result, WrapErr};
use sqlx::{postgres::PgExecutor, PgConnection, Pool, Postgres};
use studio_core::{
    capacity::{self, Admission, CapacitySnapshot, WaitlistEntry},
    errors::{StudioError, StudioResult},
    ledger,
    models::{
        booking::{Booking, BookingStatus},
        class::Class,
        package::UserPackage,
        user::User,
    },
    settings::StudioSettings,
};
use uuid::Uuid;

/// Rules that differ between client self-service and admin actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    pub timezone: Tz,
    pub charge_credits: bool,
    pub require_waiver: bool,
    pub enforce_deadline: bool,
}

impl BookingPolicy {
    pub fn for_client(settings: &StudioSettings) -> Self {
        Self {
            timezone: settings.tz(),
            charge_credits: true,
            require_waiver: settings.require_waiver,
            enforce_deadline: true,
        }
    }

    /// Admins may skip the credit charge, bypass the waiver and always refund.
    pub fn for_admin(settings: &StudioSettings, charge_credits: bool) -> Self {
        Self {
            timezone: settings.tz(),
            charge_credits,
            require_waiver: false,
            enforce_deadline: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub waitlist_position: Option<i32>,
    pub class: Class,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct PromotedBooking {
    pub booking: Booking,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub refunded_credits: i32,
    pub class: Class,
    pub user: User,
    pub promoted: Vec<PromotedBooking>,
}

pub async fn get_booking<'e, E>(executor: E, id: Uuid) -> Result<Option<DbBooking>>
where
    E: PgExecutor<'e>,
{
    let booking = sqlx::query_as::<_, DbBooking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(booking)
}

async fn lock_booking(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbBooking>> {
    let booking = sqlx::query_as::<_, DbBooking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(booking)
}

pub async fn list_user_bookings(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Vec<DbBooking>> {
    let bookings = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT * FROM bookings
        WHERE user_id = $1
        ORDER BY created_at DESC, sequence DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(bookings)
}

pub async fn set_calendar_event_id(pool: &Pool<Postgres>, id: Uuid, event_id: &str) -> Result<()> {
    sqlx::query("UPDATE bookings SET google_calendar_event_id = $2 WHERE id = $1")
        .bind(id)
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(())
}

async fn waitlist_count(conn: &mut PgConnection, class_id: Uuid) -> Result<i32> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings WHERE class_id = $1 AND status = 'waitlist'",
    )
    .bind(class_id)
    .fetch_one(conn)
    .await?;

    Ok(i32::try_from(count).unwrap_or(i32::MAX))
}

async fn has_active_booking(conn: &mut PgConnection, user_id: Uuid, class_id: Uuid) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM bookings
            WHERE user_id = $1 AND class_id = $2 AND status <> 'cancelled'
        )
        "#,
    )
    .bind(user_id)
    .bind(class_id)
    .fetch_one(conn)
    .await?;

    Ok(exists)
}

/// Charges `credits` against the user's soonest-expiring usable package.
async fn charge_credits(
    conn: &mut PgConnection,
    user_id: Uuid,
    credits: i32,
    now: DateTime<Utc>,
) -> StudioResult<Uuid> {
    let packages: Vec<UserPackage> = package::lock_user_packages(conn, user_id)
        .await?
        .into_iter()
        .map(UserPackage::from)
        .collect();

    let mut selected = ledger::select_package(&packages, credits, now)
        .cloned()
        .ok_or_else(|| {
            StudioError::InsufficientCredits(format!(
                "No active package with {} session(s) remaining",
                credits
            ))
        })?;

    ledger::consume(&mut selected, credits, now)?;
    package::set_sessions_remaining(conn, selected.id, selected.sessions_remaining).await?;

    tracing::debug!(
        "Charged {} credit(s) to package {}, {} left",
        credits,
        selected.id,
        selected.sessions_remaining
    );
    Ok(selected.id)
}

/// Gives a booking's credits back to the package they came from. Returns the credits restored.
async fn refund_credits(conn: &mut PgConnection, booking: &DbBooking) -> Result<i32> {
    let Some(package_id) = booking.user_package_id else {
        return Ok(0);
    };
    if booking.credits_used <= 0 {
        return Ok(0);
    }

    let Some(row) = package::lock_user_package(conn, package_id).await? else {
        tracing::warn!(
            "Booking {} references missing user package {}, nothing refunded",
            booking.id,
            package_id
        );
        return Ok(0);
    };

    let mut user_package = UserPackage::from(row);
    ledger::refund(&mut user_package, booking.credits_used);
    package::set_sessions_remaining(conn, user_package.id, user_package.sessions_remaining).await?;

    Ok(booking.credits_used)
}

/// Books `user_id` into `class_id`, confirmed when a seat is free and waitlisted otherwise.
pub async fn create_booking(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    class_id: Uuid,
    policy: BookingPolicy,
) -> StudioResult<BookingOutcome> {
    let now = Utc::now();
    let mut tx = pool.begin().await.wrap_err("Failed to start booking transaction")?;

    let Some(class_row) = class::lock_class(&mut tx, class_id).await? else {
        return Err(StudioError::NotFound(format!("Class {} not found", class_id)));
    };
    let mut class = Class::from(class_row);

    if !class.is_active {
        return Err(StudioError::Conflict(format!(
            "Class {} is no longer running",
            class.name
        )));
    }
    if class.starts_at(policy.timezone) <= now {
        return Err(StudioError::Validation(format!(
            "Class {} has already started",
            class.name
        )));
    }

    let Some(user_row) = user::get_user_by_id(&mut *tx, user_id).await? else {
        return Err(StudioError::NotFound(format!("User {} not found", user_id)));
    };
    let user = User::from(user_row);

    if policy.require_waiver && !user.has_signed_waiver() {
        return Err(StudioError::Authorization(
            "A signed waiver is required before booking".to_string(),
        ));
    }

    if has_active_booking(&mut tx, user_id, class_id).await? {
        return Err(StudioError::Conflict(
            "You already have a booking for this class".to_string(),
        ));
    }

    let waiting = waitlist_count(&mut tx, class_id).await?;
    let admission = capacity::admit(&CapacitySnapshot::of(&class, waiting))?;

    let (user_package_id, credits_used) = if policy.charge_credits && class.credits_required > 0 {
        let package_id = charge_credits(&mut tx, user_id, class.credits_required, now).await?;
        (Some(package_id), class.credits_required)
    } else {
        (None, 0)
    };

    let (status, waitlist_position) = match admission {
        Admission::Confirmed => (BookingStatus::Confirmed, None),
        Admission::Waitlisted { position } => (BookingStatus::Waitlist, Some(position)),
    };

    let inserted = sqlx::query_as::<_, DbBooking>(
        r#"
        INSERT INTO bookings (id, user_id, class_id, status, user_package_id, credits_used, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(class_id)
    .bind(status.as_str())
    .bind(user_package_id)
    .bind(credits_used)
    .bind(now)
    .fetch_one(&mut *tx)
    .await;

    let row = match inserted {
        Ok(row) => row,
        Err(err) if is_unique_violation(&err) => {
            return Err(StudioError::Conflict(
                "You already have a booking for this class".to_string(),
            ));
        }
        Err(err) => return Err(eyre::Report::new(err).wrap_err("Failed to insert booking").into()),
    };

    if status == BookingStatus::Confirmed {
        if !class::take_seat(&mut tx, class_id).await? {
            return Err(StudioError::Conflict("Class is full".to_string()));
        }
        class.current_participants += 1;

        if class.is_weightlifting() {
            user::adjust_weightlifting_count(&mut *tx, user_id, 1).await?;
        }
    }

    tx.commit().await.wrap_err("Failed to commit booking")?;

    tracing::info!(
        "Booked user {} into class {} ({}): status={}, credits_used={}",
        user_id,
        class_id,
        class.name,
        status,
        credits_used
    );

    Ok(BookingOutcome {
        booking: Booking::try_from(row)?,
        waitlist_position,
        class,
        user,
    })
}

/// Cancels a booking, refunds when due and promotes the waitlist into a freed seat.
///
/// When `acting_user` is given the booking must belong to that user.
pub async fn cancel_booking(
    pool: &Pool<Postgres>,
    booking_id: Uuid,
    acting_user: Option<Uuid>,
    policy: BookingPolicy,
) -> StudioResult<CancellationOutcome> {
    let now = Utc::now();

    // Unlocked read to find the class so its lock can be taken first
    let Some(peek) = get_booking(pool, booking_id).await? else {
        return Err(StudioError::NotFound(format!("Booking {} not found", booking_id)));
    };

    let mut tx = pool.begin().await.wrap_err("Failed to start cancellation transaction")?;

    let Some(mut class_row) = class::lock_class(&mut tx, peek.class_id).await? else {
        return Err(StudioError::NotFound(format!("Class {} not found", peek.class_id)));
    };
    let Some(row) = lock_booking(&mut tx, booking_id).await? else {
        return Err(StudioError::NotFound(format!("Booking {} not found", booking_id)));
    };

    if let Some(actor) = acting_user {
        if actor != row.user_id {
            return Err(StudioError::Authorization(
                "Bookings can only be cancelled by their owner".to_string(),
            ));
        }
    }

    let previous: BookingStatus = row.status.parse()?;
    if previous == BookingStatus::Cancelled {
        return Err(StudioError::Conflict(format!(
            "Booking {} is already cancelled",
            booking_id
        )));
    }

    let class = Class::from(class_row.clone());
    let refunded_credits = if ledger::refund_due(
        previous,
        class.starts_at(policy.timezone),
        class.cancellation_deadline_hours,
        now,
        policy.enforce_deadline,
    ) {
        refund_credits(&mut tx, &row).await?
    } else {
        tracing::debug!("Booking {} cancelled after the deadline, no refund", booking_id);
        0
    };

    let cancelled = sqlx::query_as::<_, DbBooking>(
        r#"
        UPDATE bookings
        SET status = 'cancelled', cancelled_at = $2
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(booking_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .wrap_err("Failed to cancel booking")?;

    let mut promoted = Vec::new();
    if previous == BookingStatus::Confirmed {
        class_row.current_participants = capacity::release(class_row.current_participants);
        class::set_participants(&mut tx, class_row.id, class_row.current_participants).await?;

        if class.is_weightlifting() {
            user::adjust_weightlifting_count(&mut *tx, row.user_id, -1).await?;
        }

        for promoted_row in promote_waitlist(&mut tx, &class_row, now).await? {
            let promoted_user = user::get_user_by_id(&mut *tx, promoted_row.user_id)
                .await?
                .ok_or_else(|| {
                    StudioError::NotFound(format!("User {} not found", promoted_row.user_id))
                })?;
            promoted.push(PromotedBooking {
                booking: Booking::try_from(promoted_row)?,
                user: promoted_user.into(),
            });
        }
    }

    let owner = user::get_user_by_id(&mut *tx, row.user_id)
        .await?
        .ok_or_else(|| StudioError::NotFound(format!("User {} not found", row.user_id)))?;
    let class = class::get_class(&mut *tx, class_row.id)
        .await?
        .map(Class::from)
        .unwrap_or(class);

    tx.commit().await.wrap_err("Failed to commit cancellation")?;

    tracing::info!(
        "Cancelled booking {} ({}): refunded {} credits, promoted {}",
        booking_id,
        previous,
        refunded_credits,
        promoted.len()
    );

    Ok(CancellationOutcome {
        booking: Booking::try_from(cancelled)?,
        refunded_credits,
        class,
        user: owner.into(),
        promoted,
    })
}

/// Moves the oldest waitlisted bookings into open seats of a locked class.
///
/// Credits were charged when the bookings joined the waitlist, so promotion
/// never charges again.
pub async fn promote_waitlist(
    conn: &mut PgConnection,
    class_row: &DbClass,
    now: DateTime<Utc>,
) -> StudioResult<Vec<DbBooking>> {
    if !class_row.is_active {
        return Ok(Vec::new());
    }

    let seats = capacity::open_seats(class_row.current_participants, class_row.max_participants);
    if seats == 0 {
        return Ok(Vec::new());
    }

    let waiting = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT * FROM bookings
        WHERE class_id = $1 AND status = 'waitlist'
        ORDER BY created_at, sequence
        FOR UPDATE
        "#,
    )
    .bind(class_row.id)
    .fetch_all(&mut *conn)
    .await
    .wrap_err("Failed to load waitlist")?;

    let entries: Vec<WaitlistEntry> = waiting.iter().map(DbBooking::waitlist_entry).collect();
    let is_weightlifting = Class::from(class_row.clone()).is_weightlifting();

    let mut promoted = Vec::new();
    for entry in capacity::promotion_order(&entries, seats) {
        if !class::take_seat(&mut *conn, class_row.id).await? {
            break;
        }

        let row = sqlx::query_as::<_, DbBooking>(
            r#"
            UPDATE bookings
            SET status = 'confirmed', promoted_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(entry.booking_id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .wrap_err("Failed to promote waitlisted booking")?;

        if is_weightlifting {
            user::adjust_weightlifting_count(&mut *conn, row.user_id, 1).await?;
        }

        tracing::info!(
            "Promoted booking {} for user {} from the waitlist of class {}",
            row.id,
            row.user_id,
            class_row.id
        );
        promoted.push(row);
    }

    Ok(promoted)
}

/// Cancels every active booking of a locked class with a full refund.
/// Returns the number of bookings cancelled and the credits refunded.
pub async fn cancel_all_for_class(conn: &mut PgConnection, class_row: &DbClass) -> StudioResult<(usize, i32)> {
    let now = Utc::now();
    let active = sqlx::query_as::<_, DbBooking>(
        r#"
        SELECT * FROM bookings
        WHERE class_id = $1 AND status <> 'cancelled'
        ORDER BY created_at, sequence
        FOR UPDATE
        "#,
    )
    .bind(class_row.id)
    .fetch_all(&mut *conn)
    .await
    .wrap_err("Failed to load class bookings")?;

    let is_weightlifting = Class::from(class_row.clone()).is_weightlifting();
    let mut refunded = 0;
    for row in &active {
        refunded += refund_credits(&mut *conn, row).await?;
        if is_weightlifting && row.status == BookingStatus::Confirmed.as_str() {
            user::adjust_weightlifting_count(&mut *conn, row.user_id, -1).await?;
        }
    }

    sqlx::query(
        r#"
        UPDATE bookings
        SET status = 'cancelled', cancelled_at = $2
        WHERE class_id = $1 AND status <> 'cancelled'
        "#,
    )
    .bind(class_row.id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .wrap_err("Failed to cancel class bookings")?;

    Ok((active.len(), refunded))
}
