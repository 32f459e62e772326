//! # Studio API
//!
//! HTTP server for the studio booking platform: class schedule, bookings and
//! waitlists, packages and credits, client onboarding, and the admin surface.
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate requests into repository calls
//! - **Middleware**: Admin authentication and error mapping
//! - **Notifications**: Calendar/email collaborators told about booking changes
//! - **Config**: Environment configuration for the server
//!
//! Business rules live in `studio-core`; every booking mutation runs as one
//! transaction in `studio-db`.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Middleware for authentication and error handling
pub mod middleware;
pub mod notifications;
/// Route definitions and API endpoint structure
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use eyre::Result;
use sqlx::PgPool;
use studio_core::{notify::BookingNotifier, settings::StudioSettings};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::notifications::{LoggingNotifier, WebhookNotifier};

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    /// PostgreSQL connection pool for database operations
    pub db_pool: PgPool,
    /// Studio business-rule defaults
    pub settings: StudioSettings,
    /// Receives booking confirmations and cancellations after commit
    pub notifier: Arc<dyn BookingNotifier>,
    /// Bearer token for the admin endpoints; admin access is off when unset
    pub admin_token: Option<String>,
}

impl ApiState {
    pub fn new(config: &config::ApiConfig, db_pool: PgPool, settings: StudioSettings) -> Result<Self> {
        let notifier: Arc<dyn BookingNotifier> = match &config.calendar_webhook_url {
            Some(url) => {
                info!("Booking notifications go to {}", url);
                Arc::new(WebhookNotifier::new(
                    url.clone(),
                    Duration::from_secs(config.notification_timeout),
                )?)
            }
            None => Arc::new(LoggingNotifier),
        };

        Ok(Self {
            db_pool,
            settings,
            notifier,
            admin_token: config.admin_token.clone(),
        })
    }
}

/// Builds the application router with every public and admin route
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::classes::routes())
        .merge(routes::bookings::routes())
        .merge(routes::users::routes())
        .merge(routes::packages::routes())
        .merge(routes::admin::routes(state.clone()))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_origin(origins)
        .allow_credentials(true)
}

/// Starts the API server
///
/// Installs logging, builds the router with CORS, tracing and timeout layers,
/// and serves until the process is stopped.
///
/// # Example
///
/// ```rust,ignore
/// let config = config::ApiConfig::from_env()?;
/// let db_pool = studio_db::create_pool(&config.database_url).await?;
/// start_server(config, db_pool, StudioSettings::from_env()?).await?;
/// ```
pub async fn start_server(config: config::ApiConfig, db_pool: PgPool, settings: StudioSettings) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set; admin endpoints will refuse every request");
    }
    info!("Studio timezone: {}", settings.timezone);

    let state = Arc::new(ApiState::new(&config, db_pool, settings)?);
    let app = build_router(state);

    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    let app = app.layer(TraceLayer::new_for_http()).layer(
        tower::ServiceBuilder::new()
            .layer(axum::error_handling::HandleErrorLayer::new(handlers::handle_timeout))
            .timeout(Duration::from_secs(config.request_timeout))
            .into_inner(),
    );

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
