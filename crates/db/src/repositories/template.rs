use crate::{
    models::{DbClass, DbTemplate},
    repositories::{booking, class},
};
use chrono::{NaiveDate, Utc};
use eyre::{Result, WrapErr};
use std::collections::HashSet;
use sqlx::{postgres::PgExecutor, types::Json, PgConnection, Pool, Postgres};
use studio_core::{
    errors::{StudioError, StudioResult},
    models::{
        class::Class,
        template::{GenerateClassesResponse, RecurringTemplate, UpdateTemplateRequest},
    },
    scheduling,
};
use uuid::Uuid;

fn day_indexes(template: &RecurringTemplate) -> Vec<i32> {
    template.days_of_week.iter().map(|day| day.index()).collect()
}

pub async fn create_template(pool: &Pool<Postgres>, template: &RecurringTemplate) -> StudioResult<RecurringTemplate> {
    let row = sqlx::query_as::<_, DbTemplate>(
        r#"
        INSERT INTO recurring_class_templates (
            id, name, description, instructor, class_type, days_of_week, start_time, end_time,
            daily_schedule, start_date, end_date, max_participants, price_cents, credits_required,
            waitlist_enabled, waitlist_capacity, cancellation_deadline_hours, is_active, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING *
        "#,
    )
    .bind(template.id)
    .bind(&template.name)
    .bind(template.description.as_deref())
    .bind(template.instructor.as_deref())
    .bind(&template.class_type)
    .bind(day_indexes(template))
    .bind(template.start_time)
    .bind(template.end_time)
    .bind(template.daily_schedule.as_ref().map(Json))
    .bind(template.start_date)
    .bind(template.end_date)
    .bind(template.max_participants)
    .bind(template.price_cents)
    .bind(template.credits_required)
    .bind(template.waitlist_enabled)
    .bind(template.waitlist_capacity)
    .bind(template.cancellation_deadline_hours)
    .bind(template.is_active)
    .bind(template.created_at)
    .fetch_one(pool)
    .await
    .wrap_err("Failed to insert template")?;

    tracing::info!("Created template {} ({})", row.id, row.name);
    RecurringTemplate::try_from(row)
}

pub async fn get_template<'e, E>(executor: E, id: Uuid) -> StudioResult<Option<RecurringTemplate>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, DbTemplate>("SELECT * FROM recurring_class_templates WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .wrap_err("Failed to load template")?;

    row.map(RecurringTemplate::try_from).transpose()
}

pub async fn list_templates(pool: &Pool<Postgres>, active_only: bool) -> StudioResult<Vec<RecurringTemplate>> {
    let rows = sqlx::query_as::<_, DbTemplate>(
        r#"
        SELECT * FROM recurring_class_templates
        WHERE is_active OR NOT $1
        ORDER BY name, start_date
        "#,
    )
    .bind(active_only)
    .fetch_all(pool)
    .await
    .wrap_err("Failed to list templates")?;

    rows.into_iter().map(RecurringTemplate::try_from).collect()
}

/// Updates a template. Classes already materialized keep their own copy of the rules.
///
/// Setting `is_active` to false deactivates the template the same way
/// [`deactivate_template`] does, upcoming classes included.
pub async fn update_template(
    pool: &Pool<Postgres>,
    id: Uuid,
    update: UpdateTemplateRequest,
) -> StudioResult<RecurringTemplate> {
    let mut tx = pool.begin().await.wrap_err("Failed to start template update")?;

    let Some(row) = sqlx::query_as::<_, DbTemplate>(
        "SELECT * FROM recurring_class_templates WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .wrap_err("Failed to load template")?
    else {
        return Err(StudioError::NotFound(format!("Template {} not found", id)));
    };
    let mut template = RecurringTemplate::try_from(row)?;

    let deactivating = template.is_active && update.is_active == Some(false);
    template.apply_update(update);
    template.validate()?;

    let row = sqlx::query_as::<_, DbTemplate>(
        r#"
        UPDATE recurring_class_templates
        SET name = $2, description = $3, instructor = $4, class_type = $5, days_of_week = $6,
            start_time = $7, end_time = $8, daily_schedule = $9, start_date = $10, end_date = $11,
            max_participants = $12, price_cents = $13, credits_required = $14,
            waitlist_enabled = $15, waitlist_capacity = $16, cancellation_deadline_hours = $17,
            is_active = $18
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&template.name)
    .bind(template.description.as_deref())
    .bind(template.instructor.as_deref())
    .bind(&template.class_type)
    .bind(day_indexes(&template))
    .bind(template.start_time)
    .bind(template.end_time)
    .bind(template.daily_schedule.as_ref().map(Json))
    .bind(template.start_date)
    .bind(template.end_date)
    .bind(template.max_participants)
    .bind(template.price_cents)
    .bind(template.credits_required)
    .bind(template.waitlist_enabled)
    .bind(template.waitlist_capacity)
    .bind(template.cancellation_deadline_hours)
    .bind(template.is_active)
    .fetch_one(&mut *tx)
    .await
    .wrap_err("Failed to update template")?;

    if deactivating {
        let removed = deactivate_upcoming_classes(&mut tx, id).await?;
        tracing::info!("Deactivated template {} and {} upcoming classes", id, removed);
    }

    tx.commit().await.wrap_err("Failed to commit template update")?;

    RecurringTemplate::try_from(row)
}

/// Deactivates a template together with its upcoming classes. Bookings on those
/// classes are cancelled with a refund. Returns the number of classes deactivated.
pub async fn deactivate_template(pool: &Pool<Postgres>, id: Uuid) -> StudioResult<usize> {
    let mut tx = pool.begin().await.wrap_err("Failed to start template deactivation")?;

    let updated = sqlx::query("UPDATE recurring_class_templates SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .wrap_err("Failed to deactivate template")?;
    if updated.rows_affected() == 0 {
        return Err(StudioError::NotFound(format!("Template {} not found", id)));
    }

    let removed = deactivate_upcoming_classes(&mut tx, id).await?;

    tx.commit().await.wrap_err("Failed to commit template deactivation")?;

    tracing::info!("Deactivated template {} and {} upcoming classes", id, removed);
    Ok(removed)
}

/// Cancels and refunds the bookings of every active class of the template dated
/// today or later, then deactivates those classes. Past classes are left alone.
async fn deactivate_upcoming_classes(conn: &mut PgConnection, template_id: Uuid) -> StudioResult<usize> {
    let upcoming = sqlx::query_as::<_, DbClass>(
        r#"
        SELECT * FROM classes
        WHERE template_id = $1 AND is_active AND class_date >= $2
        ORDER BY class_date
        FOR UPDATE
        "#,
    )
    .bind(template_id)
    .bind(Utc::now().date_naive())
    .fetch_all(&mut *conn)
    .await
    .wrap_err("Failed to load upcoming template classes")?;

    for class_row in &upcoming {
        let (cancelled, refunded) = booking::cancel_all_for_class(&mut *conn, class_row).await?;
        sqlx::query("UPDATE classes SET is_active = FALSE, current_participants = 0 WHERE id = $1")
            .bind(class_row.id)
            .execute(&mut *conn)
            .await
            .wrap_err("Failed to deactivate class")?;
        if cancelled > 0 {
            tracing::info!(
                "Class {} removed with template {}: cancelled {} bookings, refunded {} credits",
                class_row.id,
                template_id,
                cancelled,
                refunded
            );
        }
    }

    Ok(upcoming.len())
}

/// Creates the template's classes in `[from, to]`. Dates that already have a class
/// are skipped, so repeated runs are idempotent.
pub async fn materialize_template(
    pool: &Pool<Postgres>,
    id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> StudioResult<GenerateClassesResponse> {
    scheduling::validate_range(from, to)?;

    let Some(template) = get_template(pool, id).await? else {
        return Err(StudioError::NotFound(format!("Template {} not found", id)));
    };

    materialize(pool, &template, from, to).await
}

pub(crate) async fn materialize(
    pool: &Pool<Postgres>,
    template: &RecurringTemplate,
    from: NaiveDate,
    to: NaiveDate,
) -> StudioResult<GenerateClassesResponse> {
    let mut tx = pool.begin().await.wrap_err("Failed to start materialization")?;

    let existing = class::existing_dates_for_template(&mut *tx, template.id, from, to).await?;
    let planned = scheduling::expand_template(template, from, to, &existing);
    let candidates = scheduling::expand_template(template, from, to, &HashSet::new()).len();

    let mut classes = Vec::with_capacity(planned.len());
    for planned_class in &planned {
        match class::insert_template_class(&mut *tx, planned_class).await? {
            Some(row) => classes.push(Class::from(row)),
            None => tracing::debug!(
                "Class for template {} on {} already exists",
                template.id,
                planned_class.class_date
            ),
        }
    }
    let skipped = candidates - classes.len();

    tx.commit().await.wrap_err("Failed to commit materialization")?;

    tracing::info!(
        "Materialized template {} ({}) from {} to {}: {} created, {} skipped",
        template.id,
        template.name,
        from,
        to,
        classes.len(),
        skipped
    );

    Ok(GenerateClassesResponse {
        template_id: template.id,
        created: classes.len(),
        skipped,
        classes,
    })
}

pub async fn list_active_templates(pool: &Pool<Postgres>) -> Result<Vec<DbTemplate>> {
    let rows = sqlx::query_as::<_, DbTemplate>(
        "SELECT * FROM recurring_class_templates WHERE is_active ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
