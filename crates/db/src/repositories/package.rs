use crate::models::{DbPackage, DbPurchase, DbUserPackage};
use chrono::Utc;
use eyre::{Result, WrapErr};
use sqlx::{postgres::PgExecutor, PgConnection, Pool, Postgres};
use studio_core::{
    errors::{StudioError, StudioResult},
    ledger,
    models::package::{CreatePackageRequest, Package, UpdatePackageRequest},
};
use uuid::Uuid;

pub async fn create_package(pool: &Pool<Postgres>, request: &CreatePackageRequest) -> Result<DbPackage> {
    let package = sqlx::query_as::<_, DbPackage>(
        r#"
        INSERT INTO packages (id, name, description, price_cents, sessions, duration_days, is_active, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.name.trim())
    .bind(request.description.as_deref())
    .bind(request.price_cents)
    .bind(request.sessions)
    .bind(request.duration_days)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    tracing::info!("Created package {} ({})", package.id, package.name);
    Ok(package)
}

pub async fn get_package<'e, E>(executor: E, id: Uuid) -> Result<Option<DbPackage>>
where
    E: PgExecutor<'e>,
{
    let package = sqlx::query_as::<_, DbPackage>("SELECT * FROM packages WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(package)
}

pub async fn list_packages(pool: &Pool<Postgres>, include_inactive: bool) -> Result<Vec<DbPackage>> {
    let packages = sqlx::query_as::<_, DbPackage>(
        r#"
        SELECT * FROM packages
        WHERE is_active OR $1
        ORDER BY price_cents, name
        "#,
    )
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;

    Ok(packages)
}

pub async fn update_package(
    pool: &Pool<Postgres>,
    id: Uuid,
    update: UpdatePackageRequest,
) -> StudioResult<DbPackage> {
    let Some(existing) = get_package(pool, id).await? else {
        return Err(StudioError::NotFound(format!("Package {} not found", id)));
    };

    let mut package = Package::from(existing);
    package.apply_update(update)?;

    let updated = sqlx::query_as::<_, DbPackage>(
        r#"
        UPDATE packages
        SET name = $2, description = $3, price_cents = $4, sessions = $5,
            duration_days = $6, is_active = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&package.name)
    .bind(package.description.as_deref())
    .bind(package.price_cents)
    .bind(package.sessions)
    .bind(package.duration_days)
    .bind(package.is_active)
    .fetch_one(pool)
    .await
    .wrap_err("Failed to update package")?;

    Ok(updated)
}

/// Deactivated packages stay on record for existing purchases but can no longer be bought.
pub async fn deactivate_package(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbPackage>> {
    let package = sqlx::query_as::<_, DbPackage>(
        "UPDATE packages SET is_active = FALSE WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(package)
}

/// Records a purchase and grants the matching user package in one transaction.
pub async fn purchase_package(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    package_id: Uuid,
    payment_reference: Option<&str>,
) -> StudioResult<(DbPurchase, DbUserPackage)> {
    let mut tx = pool.begin().await.wrap_err("Failed to start purchase transaction")?;

    let Some(package) = get_package(&mut *tx, package_id).await? else {
        return Err(StudioError::NotFound(format!("Package {} not found", package_id)));
    };
    if !package.is_active {
        return Err(StudioError::Validation(format!(
            "Package {} is no longer for sale",
            package.name
        )));
    }
    if super::user::get_user_by_id(&mut *tx, user_id).await?.is_none() {
        return Err(StudioError::NotFound(format!("User {} not found", user_id)));
    }

    let now = Utc::now();
    let expiry_date = ledger::expiry_date(now, package.duration_days)?;
    let purchase = sqlx::query_as::<_, DbPurchase>(
        r#"
        INSERT INTO purchases (id, user_id, package_id, amount_cents, payment_reference, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(package_id)
    .bind(package.price_cents)
    .bind(payment_reference)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .wrap_err("Failed to record purchase")?;

    let user_package = sqlx::query_as::<_, DbUserPackage>(
        r#"
        INSERT INTO user_packages
            (id, user_id, package_id, purchase_id, sessions_remaining, purchase_date, expiry_date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(package_id)
    .bind(purchase.id)
    .bind(package.sessions)
    .bind(now)
    .bind(expiry_date)
    .fetch_one(&mut *tx)
    .await
    .wrap_err("Failed to grant user package")?;

    tx.commit().await.wrap_err("Failed to commit purchase")?;

    tracing::info!(
        "User {} purchased package {}: {} sessions until {}",
        user_id,
        package.name,
        user_package.sessions_remaining,
        user_package.expiry_date
    );
    Ok((purchase, user_package))
}

pub async fn list_user_packages<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<DbUserPackage>>
where
    E: PgExecutor<'e>,
{
    let packages = sqlx::query_as::<_, DbUserPackage>(
        r#"
        SELECT * FROM user_packages
        WHERE user_id = $1
        ORDER BY expiry_date, purchase_date
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(packages)
}

/// Locks every package of a user for the rest of the transaction.
pub async fn lock_user_packages(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<DbUserPackage>> {
    let packages = sqlx::query_as::<_, DbUserPackage>(
        r#"
        SELECT * FROM user_packages
        WHERE user_id = $1
        ORDER BY expiry_date, purchase_date
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(packages)
}

pub async fn lock_user_package(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbUserPackage>> {
    let package = sqlx::query_as::<_, DbUserPackage>(
        "SELECT * FROM user_packages WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(package)
}

pub async fn set_sessions_remaining(conn: &mut PgConnection, id: Uuid, sessions_remaining: i32) -> Result<()> {
    sqlx::query("UPDATE user_packages SET sessions_remaining = $2 WHERE id = $1")
        .bind(id)
        .bind(sessions_remaining)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn extend_user_package(pool: &Pool<Postgres>, id: Uuid, days: i64) -> StudioResult<DbUserPackage> {
    let mut tx = pool.begin().await.wrap_err("Failed to start extension transaction")?;

    let Some(row) = lock_user_package(&mut tx, id).await? else {
        return Err(StudioError::NotFound(format!("User package {} not found", id)));
    };

    let mut package = studio_core::models::package::UserPackage::from(row);
    ledger::extend(&mut package, days)?;

    let updated = sqlx::query_as::<_, DbUserPackage>(
        "UPDATE user_packages SET expiry_date = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(package.expiry_date)
    .fetch_one(&mut *tx)
    .await
    .wrap_err("Failed to extend user package")?;

    tx.commit().await.wrap_err("Failed to commit extension")?;

    tracing::info!("Extended user package {} by {} days to {}", id, days, updated.expiry_date);
    Ok(updated)
}

/// Pushes the expiry of every user package forward by `days`. Returns the number of rows touched.
pub async fn extend_all_user_packages(pool: &Pool<Postgres>, days: i64) -> StudioResult<u64> {
    let interval_days = ledger::extension_days(days)?;

    let result = sqlx::query(
        "UPDATE user_packages SET expiry_date = expiry_date + make_interval(days => $1)",
    )
    .bind(interval_days)
    .execute(pool)
    .await
    .wrap_err("Failed to extend user packages")?;

    tracing::info!("Extended {} user packages by {} days", result.rows_affected(), days);
    Ok(result.rows_affected())
}
