//! Admin endpoints. Every route here sits behind the bearer-token guard.

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, middleware::auth::require_admin, ApiState};

pub fn routes(state: Arc<ApiState>) -> Router<Arc<ApiState>> {
    Router::new()
        // Classes and rosters
        .route("/api/admin/classes", post(handlers::classes::create_class))
        .route(
            "/api/admin/classes/:id",
            get(handlers::classes::get_class)
                .put(handlers::classes::update_class)
                .delete(handlers::classes::deactivate_class),
        )
        .route(
            "/api/classes/:id/participants",
            get(handlers::classes::list_participants),
        )
        .route(
            "/api/admin/classes/:id/participants",
            get(handlers::classes::list_participants).post(handlers::bookings::add_participant),
        )
        .route(
            "/api/admin/bookings/:id",
            delete(handlers::bookings::remove_participant),
        )
        // Recurring templates
        .route(
            "/api/admin/templates",
            get(handlers::templates::list_templates).post(handlers::templates::create_template),
        )
        .route(
            "/api/admin/templates/:id",
            get(handlers::templates::get_template)
                .put(handlers::templates::update_template)
                .delete(handlers::templates::deactivate_template),
        )
        .route(
            "/api/admin/templates/:id/generate",
            post(handlers::templates::generate_classes),
        )
        // Packages and credits
        .route("/api/admin/packages", post(handlers::packages::create_package))
        .route(
            "/api/admin/packages/:id",
            put(handlers::packages::update_package)
                .delete(handlers::packages::deactivate_package),
        )
        .route(
            "/api/admin/user-packages/:id/extend",
            post(handlers::packages::extend_user_package),
        )
        // Clients
        .route("/api/admin/clients", get(handlers::users::list_clients))
        .route(
            "/api/admin/clients/:id",
            put(handlers::users::update_client),
        )
        .route(
            "/api/admin/clients/:id/waiver",
            get(handlers::users::get_waiver_document),
        )
        // Maintenance
        .route(
            "/api/admin/maintenance/reconcile",
            post(handlers::maintenance::reconcile),
        )
        .route_layer(from_fn_with_state(state, require_admin))
}
