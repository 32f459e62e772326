use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use std::sync::Arc;
use studio_core::{
    errors::StudioError,
    models::user::{
        LoginRequest, LoginResponse, RegisterUserRequest, UpdateClientRequest, User,
        WaiverSubmissionRequest,
    },
};
use studio_db::repositories::user as user_repo;
use uuid::Uuid;

use crate::{middleware::{auth, error_handling::AppError}, ApiState};

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    payload.validate()?;

    let password_hash = match &payload.password {
        Some(password) => Some(auth::hash_password(password)?),
        None => None,
    };

    let user = user_repo::create_user(&state.db_pool, &payload, password_hash.as_deref()).await?;

    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = auth::verify_login(&state.db_pool, &payload.email, &payload.password)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::Authentication("Invalid email or password".to_string()))?;

    Ok(Json(LoginResponse { user: user.into() }))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = user_repo::get_user_by_id(&state.db_pool, id)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::NotFound(format!("User with ID {} not found", id)))?;

    Ok(Json(user.into()))
}

#[axum::debug_handler]
pub async fn submit_waiver(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WaiverSubmissionRequest>,
) -> Result<Json<User>, AppError> {
    let signature = payload.signature.trim();
    if signature.is_empty() {
        return Err(AppError(StudioError::Validation(
            "A waiver signature is required".to_string(),
        )));
    }

    let pdf = payload
        .pdf_base64
        .as_deref()
        .map(|encoded| {
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| StudioError::Validation(format!("Waiver document is not valid base64: {}", e)))
        })
        .transpose()?;

    let user = user_repo::record_waiver(
        &state.db_pool,
        id,
        signature,
        payload.signed_date.unwrap_or_else(Utc::now),
        pdf.as_deref(),
    )
    .await
    .map_err(StudioError::Database)?
    .ok_or_else(|| StudioError::NotFound(format!("User with ID {} not found", id)))?;

    tracing::info!("User {} signed the waiver", id);
    Ok(Json(user.into()))
}

#[axum::debug_handler]
pub async fn list_clients(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<User>>, AppError> {
    let users = user_repo::list_users(&state.db_pool)
        .await
        .map_err(StudioError::Database)?;

    Ok(Json(users.into_iter().map(User::from).collect()))
}

#[axum::debug_handler]
pub async fn update_client(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<User>, AppError> {
    if payload.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError(StudioError::Validation("Name cannot be empty".to_string())));
    }

    let user = user_repo::update_user(&state.db_pool, id, &payload)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::NotFound(format!("User with ID {} not found", id)))?;

    Ok(Json(user.into()))
}

#[axum::debug_handler]
pub async fn get_waiver_document(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let pdf = user_repo::get_waiver_pdf(&state.db_pool, id)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::NotFound(format!("No waiver document for user {}", id)))?;

    Ok(([(header::CONTENT_TYPE, "application/pdf")], pdf))
}
