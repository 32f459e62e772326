use axum::{routing::get, Router};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/classes", get(handlers::classes::list_classes))
        .route("/api/classes/:id", get(handlers::classes::get_class))
}
