use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studio_core::{
    errors::StudioError,
    models::template::{
        CreateTemplateRequest, GenerateClassesRequest, GenerateClassesResponse, RecurringTemplate,
        UpdateTemplateRequest,
    },
};
use studio_db::repositories::template as template_repo;
use uuid::Uuid;

use crate::{middleware::error_handling::AppError, ApiState};

#[derive(Debug, Default, Deserialize)]
pub struct TemplateListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize)]
pub struct DeactivateTemplateResponse {
    pub template_id: Uuid,
    pub deactivated_classes: usize,
}

#[axum::debug_handler]
pub async fn list_templates(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<Vec<RecurringTemplate>>, AppError> {
    let templates = template_repo::list_templates(&state.db_pool, !query.include_inactive).await?;
    Ok(Json(templates))
}

#[axum::debug_handler]
pub async fn create_template(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<RecurringTemplate>), AppError> {
    let template = payload.into_template(&state.settings)?;
    let created = template_repo::create_template(&state.db_pool, &template).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn get_template(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecurringTemplate>, AppError> {
    let template = template_repo::get_template(&state.db_pool, id)
        .await?
        .ok_or_else(|| StudioError::NotFound(format!("Template with ID {} not found", id)))?;

    Ok(Json(template))
}

#[axum::debug_handler]
pub async fn update_template(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> Result<Json<RecurringTemplate>, AppError> {
    let template = template_repo::update_template(&state.db_pool, id, payload).await?;
    Ok(Json(template))
}

#[axum::debug_handler]
pub async fn deactivate_template(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeactivateTemplateResponse>, AppError> {
    let deactivated_classes = template_repo::deactivate_template(&state.db_pool, id).await?;

    Ok(Json(DeactivateTemplateResponse {
        template_id: id,
        deactivated_classes,
    }))
}

#[axum::debug_handler]
pub async fn generate_classes(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateClassesRequest>,
) -> Result<Json<GenerateClassesResponse>, AppError> {
    let response = template_repo::materialize_template(&state.db_pool, id, payload.from, payload.to).await?;
    Ok(Json(response))
}
