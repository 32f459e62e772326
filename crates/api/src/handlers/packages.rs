use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use studio_core::{
    errors::StudioError,
    ledger,
    models::package::{
        CreatePackageRequest, CreditBalance, ExtendPackageRequest, Package, PurchasePackageRequest,
        PurchaseResponse, UpdatePackageRequest, UserPackage,
    },
};
use studio_db::repositories::{package as package_repo, user as user_repo};
use uuid::Uuid;

use crate::{middleware::error_handling::AppError, ApiState};

#[axum::debug_handler]
pub async fn list_packages(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<Package>>, AppError> {
    let packages = package_repo::list_packages(&state.db_pool, false)
        .await
        .map_err(StudioError::Database)?;

    Ok(Json(packages.into_iter().map(Package::from).collect()))
}

#[axum::debug_handler]
pub async fn purchase_package(
    State(state): State<Arc<ApiState>>,
    Path(package_id): Path<Uuid>,
    Json(payload): Json<PurchasePackageRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let (purchase, user_package) = package_repo::purchase_package(
        &state.db_pool,
        payload.user_id,
        package_id,
        payload.payment_reference.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            purchase: purchase.into(),
            user_package: user_package.into(),
        }),
    ))
}

async fn ensure_user_exists(state: &ApiState, user_id: Uuid) -> Result<(), AppError> {
    user_repo::get_user_by_id(&state.db_pool, user_id)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::NotFound(format!("User with ID {} not found", user_id)))?;
    Ok(())
}

#[axum::debug_handler]
pub async fn list_user_packages(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserPackage>>, AppError> {
    ensure_user_exists(&state, user_id).await?;

    let packages = package_repo::list_user_packages(&state.db_pool, user_id)
        .await
        .map_err(StudioError::Database)?;

    Ok(Json(packages.into_iter().map(UserPackage::from).collect()))
}

#[axum::debug_handler]
pub async fn get_credits(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CreditBalance>, AppError> {
    ensure_user_exists(&state, user_id).await?;

    let packages = package_repo::list_user_packages(&state.db_pool, user_id)
        .await
        .map_err(StudioError::Database)?;

    Ok(Json(ledger::balance(
        user_id,
        packages.into_iter().map(UserPackage::from).collect(),
        Utc::now(),
    )))
}

#[axum::debug_handler]
pub async fn create_package(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreatePackageRequest>,
) -> Result<(StatusCode, Json<Package>), AppError> {
    payload.validate()?;

    let package = package_repo::create_package(&state.db_pool, &payload)
        .await
        .map_err(StudioError::Database)?;

    Ok((StatusCode::CREATED, Json(package.into())))
}

#[axum::debug_handler]
pub async fn update_package(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePackageRequest>,
) -> Result<Json<Package>, AppError> {
    let package = package_repo::update_package(&state.db_pool, id, payload).await?;
    Ok(Json(package.into()))
}

#[axum::debug_handler]
pub async fn deactivate_package(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Package>, AppError> {
    let package = package_repo::deactivate_package(&state.db_pool, id)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::NotFound(format!("Package with ID {} not found", id)))?;

    Ok(Json(package.into()))
}

#[axum::debug_handler]
pub async fn extend_user_package(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExtendPackageRequest>,
) -> Result<Json<UserPackage>, AppError> {
    let package = package_repo::extend_user_package(&state.db_pool, id, payload.days).await?;
    Ok(Json(package.into()))
}
