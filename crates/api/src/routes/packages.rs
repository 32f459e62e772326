use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/packages", get(handlers::packages::list_packages))
        .route(
            "/api/packages/:id/purchase",
            post(handlers::packages::purchase_package),
        )
        .route(
            "/api/users/:id/packages",
            get(handlers::packages::list_user_packages),
        )
        .route("/api/users/:id/credits", get(handlers::packages::get_credits))
}
