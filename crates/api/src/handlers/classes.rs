use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use studio_core::{
    errors::StudioError,
    models::class::{
        Class, ClassListQuery, ClassParticipant, CreateClassRequest, DeactivateClassResponse,
        UpdateClassRequest, UpdateClassResponse,
    },
};
use studio_db::repositories::class as class_repo;
use uuid::Uuid;

use crate::{middleware::error_handling::AppError, ApiState};

#[axum::debug_handler]
pub async fn list_classes(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ClassListQuery>,
) -> Result<Json<Vec<Class>>, AppError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError(StudioError::Validation(format!(
                "from ({}) must not be after to ({})",
                from, to
            ))));
        }
    }

    let classes = class_repo::list_classes(&state.db_pool, &query)
        .await
        .map_err(StudioError::Database)?;

    Ok(Json(classes.into_iter().map(Class::from).collect()))
}

#[axum::debug_handler]
pub async fn get_class(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Class>, AppError> {
    let class = class_repo::get_class(&state.db_pool, id)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::NotFound(format!("Class with ID {} not found", id)))?;

    Ok(Json(class.into()))
}

#[axum::debug_handler]
pub async fn list_participants(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ClassParticipant>>, AppError> {
    class_repo::get_class(&state.db_pool, id)
        .await
        .map_err(StudioError::Database)?
        .ok_or_else(|| StudioError::NotFound(format!("Class with ID {} not found", id)))?;

    let participants = class_repo::list_participants(&state.db_pool, id).await?;
    Ok(Json(participants))
}

#[axum::debug_handler]
pub async fn create_class(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<Class>), AppError> {
    let class = payload.into_class(&state.settings)?;

    let created = class_repo::insert_class(&state.db_pool, &class)
        .await
        .map_err(StudioError::Database)?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[axum::debug_handler]
pub async fn update_class(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClassRequest>,
) -> Result<Json<UpdateClassResponse>, AppError> {
    let response = class_repo::update_class(&state.db_pool, id, payload).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn deactivate_class(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeactivateClassResponse>, AppError> {
    let response = class_repo::deactivate_class(&state.db_pool, id).await?;
    Ok(Json(response))
}
