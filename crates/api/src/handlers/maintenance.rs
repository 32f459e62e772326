use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use studio_core::capacity::ParticipantDrift;
use studio_db::repositories::maintenance;

use crate::{middleware::error_handling::AppError, ApiState};

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub corrected: usize,
    pub over_capacity: usize,
    pub promoted: i32,
    pub classes: Vec<ParticipantDrift>,
}

#[axum::debug_handler]
pub async fn reconcile(State(state): State<Arc<ApiState>>) -> Result<Json<ReconcileResponse>, AppError> {
    let classes = maintenance::reconcile_participant_counts(&state.db_pool).await?;

    Ok(Json(ReconcileResponse {
        corrected: classes.len(),
        over_capacity: classes.iter().filter(|drift| drift.exceeds_capacity()).count(),
        promoted: classes.iter().map(|drift| drift.promoted).sum(),
        classes,
    }))
}
