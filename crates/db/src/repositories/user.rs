use crate::{is_unique_violation, models::DbUser};
use argon2::{password_hash::PasswordHash, Argon2, PasswordVerifier};
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use sqlx::{postgres::PgExecutor, Pool, Postgres};
use studio_core::{
    errors::{StudioError, StudioResult},
    models::user::{RegisterUserRequest, UpdateClientRequest},
};
use uuid::Uuid;

const USER_COLUMNS: &str = r#"
    id, email, name, phone, password_hash, is_admin, onboarding_completed,
    waiver_signature, waiver_signed_date,
    waiver_pdf_data IS NOT NULL AS has_waiver_document,
    weightlifting_classes_booked, created_at
"#;

pub async fn create_user(
    pool: &Pool<Postgres>,
    request: &RegisterUserRequest,
    password_hash: Option<&str>,
) -> StudioResult<DbUser> {
    let email = request.email.trim().to_lowercase();
    tracing::debug!("Registering user: email={}", email);

    let result = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (id, email, name, phone, password_hash, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(request.name.trim())
    .bind(request.phone.as_deref())
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(err) if is_unique_violation(&err) => Err(StudioError::Conflict(format!(
            "A user with email {} already exists",
            email
        ))),
        Err(err) => Err(eyre::Report::new(err)
            .wrap_err("Failed to insert user")
            .into()),
    }
}

pub async fn get_user_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<DbUser>>
where
    E: PgExecutor<'e>,
{
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(user)
}

pub async fn get_user_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Checks `password` against the stored Argon2 hash. Users without a password never match.
pub async fn verify_password(pool: &Pool<Postgres>, email: &str, password: &str) -> Result<Option<DbUser>> {
    let Some(user) = get_user_by_email(pool, email).await? else {
        return Ok(None);
    };

    let Some(stored) = user.password_hash.as_deref() else {
        tracing::debug!("User {} has no password set", user.id);
        return Ok(None);
    };

    let parsed = PasswordHash::new(stored)
        .map_err(|e| eyre::eyre!("Stored password hash for user {} is invalid: {}", user.id, e))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

pub async fn list_users(pool: &Pool<Postgres>) -> Result<Vec<DbUser>> {
    let users = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY name, email"
    ))
    .fetch_all(pool)
    .await?;

    Ok(users)
}

pub async fn update_user(
    pool: &Pool<Postgres>,
    id: Uuid,
    update: &UpdateClientRequest,
) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            phone = COALESCE($3, phone),
            is_admin = COALESCE($4, is_admin)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(update.name.as_deref())
    .bind(update.phone.as_deref())
    .bind(update.is_admin)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Stores the waiver signature and optional document and completes onboarding.
pub async fn record_waiver(
    pool: &Pool<Postgres>,
    id: Uuid,
    signature: &str,
    signed_date: DateTime<Utc>,
    pdf: Option<&[u8]>,
) -> Result<Option<DbUser>> {
    tracing::debug!("Recording waiver for user {}: has_document={}", id, pdf.is_some());

    let user = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        UPDATE users
        SET waiver_signature = $2,
            waiver_signed_date = $3,
            waiver_pdf_data = COALESCE($4, waiver_pdf_data),
            onboarding_completed = TRUE
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(signature)
    .bind(signed_date)
    .bind(pdf)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_waiver_pdf(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Vec<u8>>> {
    let pdf = sqlx::query_scalar::<_, Option<Vec<u8>>>(
        "SELECT waiver_pdf_data FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .wrap_err("Failed to load waiver document")?;

    Ok(pdf.flatten())
}

/// Adjusts the weightlifting booking counter by `delta`, never below zero.
pub async fn adjust_weightlifting_count<'e, E>(executor: E, id: Uuid, delta: i32) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE users
        SET weightlifting_classes_booked = GREATEST(weightlifting_classes_booked + $2, 0)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(delta)
    .execute(executor)
    .await?;

    Ok(())
}
