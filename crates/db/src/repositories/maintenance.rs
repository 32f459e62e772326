use crate::{
    models::DbParticipantDrift,
    repositories::{booking, class, template},
};
use chrono::{NaiveDate, Utc};
use eyre::{Result, WrapErr};
use sqlx::{Pool, Postgres};
use studio_core::{
    capacity::ParticipantDrift,
    errors::StudioResult,
    models::template::{GenerateClassesResponse, RecurringTemplate},
};

/// Active classes whose stored counter differs from their confirmed bookings.
/// Waitlisted bookings hold no seat and are not counted.
pub async fn participant_drift(pool: &Pool<Postgres>) -> Result<Vec<ParticipantDrift>> {
    let rows = sqlx::query_as::<_, DbParticipantDrift>(
        r#"
        SELECT c.id AS class_id,
               c.current_participants AS recorded,
               COUNT(b.id) AS actual,
               c.max_participants
        FROM classes c
        LEFT JOIN bookings b ON b.class_id = c.id AND b.status = 'confirmed'
        WHERE c.is_active
        GROUP BY c.id
        HAVING c.current_participants <> COUNT(b.id)
        ORDER BY c.class_date, c.start_time
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ParticipantDrift::from).collect())
}

/// Rewrites drifted counters from the confirmed booking count, capped at capacity,
/// then promotes waitlisted bookings into any seats the correction opened.
pub async fn reconcile_participant_counts(pool: &Pool<Postgres>) -> StudioResult<Vec<ParticipantDrift>> {
    let now = Utc::now();
    let mut tx = pool.begin().await.wrap_err("Failed to start reconciliation")?;

    let rows = sqlx::query_as::<_, DbParticipantDrift>(
        r#"
        WITH counts AS (
            SELECT c.id AS class_id, COUNT(b.id) AS actual
            FROM classes c
            LEFT JOIN bookings b ON b.class_id = c.id AND b.status = 'confirmed'
            WHERE c.is_active
            GROUP BY c.id
        ),
        drifted AS (
            SELECT c.id, c.current_participants AS recorded, counts.actual, c.max_participants
            FROM classes c
            JOIN counts ON counts.class_id = c.id
            WHERE c.current_participants <> counts.actual
            FOR UPDATE OF c
        )
        UPDATE classes c
        SET current_participants = LEAST(drifted.actual, c.max_participants)::INTEGER
        FROM drifted
        WHERE c.id = drifted.id
        RETURNING c.id AS class_id, drifted.recorded, drifted.actual, c.max_participants
        "#,
    )
    .fetch_all(&mut *tx)
    .await
    .wrap_err("Failed to reconcile participant counts")?;

    let mut drift: Vec<ParticipantDrift> = rows.into_iter().map(ParticipantDrift::from).collect();
    for entry in &mut drift {
        let Some(class_row) = class::lock_class(&mut tx, entry.class_id).await? else {
            continue;
        };
        let promoted = booking::promote_waitlist(&mut tx, &class_row, now).await?;
        entry.promoted = i32::try_from(promoted.len()).unwrap_or(i32::MAX);
    }

    tx.commit().await.wrap_err("Failed to commit reconciliation")?;

    for class in &drift {
        if class.exceeds_capacity() {
            tracing::warn!(
                "Class {} has {} confirmed bookings for {} seats; counter capped at capacity",
                class.class_id,
                class.actual,
                class.max_participants
            );
        } else {
            tracing::info!(
                "Class {} counter corrected from {} to {}, {} promoted from the waitlist",
                class.class_id,
                class.recorded,
                class.actual,
                class.promoted
            );
        }
    }

    Ok(drift)
}

/// Resets negative participant counters to zero. Returns the number of classes fixed.
pub async fn clamp_negative_counts(pool: &Pool<Postgres>) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE classes SET current_participants = 0 WHERE current_participants < 0",
    )
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        tracing::warn!("Clamped {} negative participant counters", result.rows_affected());
    }
    Ok(result.rows_affected())
}

/// Materializes every active template over `[from, to]`.
pub async fn materialize_all(
    pool: &Pool<Postgres>,
    from: NaiveDate,
    to: NaiveDate,
) -> StudioResult<Vec<GenerateClassesResponse>> {
    let mut results = Vec::new();
    for row in template::list_active_templates(pool).await? {
        let template = RecurringTemplate::try_from(row)?;
        results.push(template::materialize(pool, &template, from, to).await?);
    }

    Ok(results)
}
