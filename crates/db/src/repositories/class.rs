use crate::models::{DbClass, DbParticipant};
use chrono::{NaiveDate, Utc};
use eyre::{Result, WrapErr};
use sqlx::{postgres::PgExecutor, PgConnection, Pool, Postgres};
use std::collections::HashSet;
use studio_core::{
    errors::{StudioError, StudioResult},
    models::{
        booking::BookingStatus,
        class::{
            Class, ClassListQuery, ClassParticipant, DeactivateClassResponse, UpdateClassRequest,
            UpdateClassResponse,
        },
    },
};
use uuid::Uuid;

use super::booking;

const INSERT_CLASS: &str = r#"
    INSERT INTO classes (
        id, template_id, name, description, instructor, class_type, class_date,
        start_time, end_time, max_participants, current_participants, price_cents,
        credits_required, waitlist_enabled, waitlist_capacity,
        cancellation_deadline_hours, is_active, created_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
"#;

fn bind_class<'q>(
    query: sqlx::query::QueryAs<'q, Postgres, DbClass, sqlx::postgres::PgArguments>,
    class: &'q Class,
) -> sqlx::query::QueryAs<'q, Postgres, DbClass, sqlx::postgres::PgArguments> {
    query
        .bind(class.id)
        .bind(class.template_id)
        .bind(&class.name)
        .bind(class.description.as_deref())
        .bind(class.instructor.as_deref())
        .bind(&class.class_type)
        .bind(class.class_date)
        .bind(class.start_time)
        .bind(class.end_time)
        .bind(class.max_participants)
        .bind(class.current_participants)
        .bind(class.price_cents)
        .bind(class.credits_required)
        .bind(class.waitlist_enabled)
        .bind(class.waitlist_capacity)
        .bind(class.cancellation_deadline_hours)
        .bind(class.is_active)
        .bind(class.created_at)
}

pub async fn insert_class(pool: &Pool<Postgres>, class: &Class) -> Result<DbClass> {
    let sql = format!("{INSERT_CLASS} RETURNING *");
    let row = bind_class(sqlx::query_as::<_, DbClass>(&sql), class)
        .fetch_one(pool)
        .await
        .wrap_err("Failed to insert class")?;

    tracing::info!("Created class {} on {} at {}", row.id, row.class_date, row.start_time);
    Ok(row)
}

/// Inserts a class generated from a template. Returns `None` when the template
/// already has a class on that date.
pub async fn insert_template_class<'e, E>(executor: E, class: &Class) -> Result<Option<DbClass>>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "{INSERT_CLASS} ON CONFLICT ON CONSTRAINT one_class_per_template_date DO NOTHING RETURNING *"
    );
    let row = bind_class(sqlx::query_as::<_, DbClass>(&sql), class)
        .fetch_optional(executor)
        .await?;

    Ok(row)
}

pub async fn get_class<'e, E>(executor: E, id: Uuid) -> Result<Option<DbClass>>
where
    E: PgExecutor<'e>,
{
    let class = sqlx::query_as::<_, DbClass>("SELECT * FROM classes WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(class)
}

/// Row-locks a class for the rest of the transaction. Every booking mutation takes
/// this lock first.
pub async fn lock_class(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbClass>> {
    let class = sqlx::query_as::<_, DbClass>("SELECT * FROM classes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(class)
}

pub async fn list_classes(pool: &Pool<Postgres>, query: &ClassListQuery) -> Result<Vec<DbClass>> {
    let classes = sqlx::query_as::<_, DbClass>(
        r#"
        SELECT * FROM classes
        WHERE ($1::DATE IS NULL OR class_date >= $1)
          AND ($2::DATE IS NULL OR class_date <= $2)
          AND (is_active OR $3)
        ORDER BY class_date, start_time
        "#,
    )
    .bind(query.from)
    .bind(query.to)
    .bind(query.include_inactive)
    .fetch_all(pool)
    .await?;

    Ok(classes)
}

pub async fn existing_dates_for_template<'e, E>(
    executor: E,
    template_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<HashSet<NaiveDate>>
where
    E: PgExecutor<'e>,
{
    let dates = sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT class_date FROM classes
        WHERE template_id = $1 AND class_date BETWEEN $2 AND $3
        "#,
    )
    .bind(template_id)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?;

    Ok(dates.into_iter().collect())
}

/// Confirmed participants first, then the waitlist in promotion order.
pub async fn list_participants(pool: &Pool<Postgres>, class_id: Uuid) -> StudioResult<Vec<ClassParticipant>> {
    let rows = sqlx::query_as::<_, DbParticipant>(
        r#"
        SELECT b.id AS booking_id, b.user_id, u.name, u.email, b.status, b.created_at
        FROM bookings b
        JOIN users u ON u.id = b.user_id
        WHERE b.class_id = $1 AND b.status <> 'cancelled'
        ORDER BY CASE b.status WHEN 'confirmed' THEN 0 ELSE 1 END, b.created_at, b.sequence
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await
    .wrap_err("Failed to list class participants")?;

    rows.into_iter()
        .map(|row| {
            Ok(ClassParticipant {
                booking_id: row.booking_id,
                user_id: row.user_id,
                name: row.name,
                email: row.email,
                status: row.status.parse::<BookingStatus>()?,
                created_at: row.created_at,
            })
        })
        .collect()
}

/// Sets the participant counter directly. Only used while the class row is locked.
pub async fn set_participants(conn: &mut PgConnection, id: Uuid, current_participants: i32) -> Result<()> {
    sqlx::query("UPDATE classes SET current_participants = $2 WHERE id = $1")
        .bind(id)
        .bind(current_participants)
        .execute(conn)
        .await?;

    Ok(())
}

/// Takes one seat. Returns false when the class was already full.
pub async fn take_seat(conn: &mut PgConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE classes
        SET current_participants = current_participants + 1
        WHERE id = $1 AND current_participants < max_participants
        "#,
    )
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Applies an admin edit. Raising capacity promotes waitlisted bookings into the new seats.
pub async fn update_class(
    pool: &Pool<Postgres>,
    id: Uuid,
    update: UpdateClassRequest,
) -> StudioResult<UpdateClassResponse> {
    let mut tx = pool.begin().await.wrap_err("Failed to start class update")?;

    let Some(row) = lock_class(&mut tx, id).await? else {
        return Err(StudioError::NotFound(format!("Class {} not found", id)));
    };

    let mut class = Class::from(row);
    class.apply_update(update);
    class.validate()?;

    let updated = sqlx::query_as::<_, DbClass>(
        r#"
        UPDATE classes
        SET name = $2, description = $3, instructor = $4, class_type = $5, class_date = $6,
            start_time = $7, end_time = $8, max_participants = $9, price_cents = $10,
            credits_required = $11, waitlist_enabled = $12, waitlist_capacity = $13,
            cancellation_deadline_hours = $14
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&class.name)
    .bind(class.description.as_deref())
    .bind(class.instructor.as_deref())
    .bind(&class.class_type)
    .bind(class.class_date)
    .bind(class.start_time)
    .bind(class.end_time)
    .bind(class.max_participants)
    .bind(class.price_cents)
    .bind(class.credits_required)
    .bind(class.waitlist_enabled)
    .bind(class.waitlist_capacity)
    .bind(class.cancellation_deadline_hours)
    .fetch_one(&mut *tx)
    .await
    .wrap_err("Failed to update class")?;

    let promoted = booking::promote_waitlist(&mut tx, &updated, Utc::now()).await?;

    let class = if promoted.is_empty() {
        updated
    } else {
        get_class(&mut *tx, id)
            .await?
            .ok_or_else(|| StudioError::NotFound(format!("Class {} not found", id)))?
    };

    tx.commit().await.wrap_err("Failed to commit class update")?;

    if !promoted.is_empty() {
        tracing::info!("Class {} capacity change promoted {} bookings", id, promoted.len());
    }

    Ok(UpdateClassResponse {
        class: class.into(),
        promoted_bookings: promoted.iter().map(|booking| booking.id).collect(),
    })
}

/// Deactivates a class and cancels every active booking on it with a full refund.
pub async fn deactivate_class(pool: &Pool<Postgres>, id: Uuid) -> StudioResult<DeactivateClassResponse> {
    let mut tx = pool.begin().await.wrap_err("Failed to start class deactivation")?;

    let Some(class) = lock_class(&mut tx, id).await? else {
        return Err(StudioError::NotFound(format!("Class {} not found", id)));
    };

    let (cancelled_bookings, refunded_credits) = booking::cancel_all_for_class(&mut tx, &class).await?;

    sqlx::query("UPDATE classes SET is_active = FALSE, current_participants = 0 WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .wrap_err("Failed to deactivate class")?;

    tx.commit().await.wrap_err("Failed to commit class deactivation")?;

    tracing::info!(
        "Deactivated class {}: cancelled {} bookings, refunded {} credits",
        id,
        cancelled_bookings,
        refunded_credits
    );

    Ok(DeactivateClassResponse {
        class_id: id,
        cancelled_bookings,
        refunded_credits,
    })
}
