// Axum web server layer

use axum::{error_handling::HandleErrorLayer, http::StatusCode, routing::{get, post}, BoxError, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod responses;

use crate::config::Config;
use crate::orchestrator::BatchAccessOrchestrator;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BatchAccessOrchestrator>,
    pub config: Arc<Config>,
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Body size limit (tower-http::limit)
/// - Request tracing (tower-http::trace)
/// - Request timeout (tower::timeout), mapped to 408, on every route except
///   `/v1/scan`, which is bounded by the per-command controller timeout
pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    // HandleErrorLayer must come BEFORE timeout to catch the timeout error
    let timeout_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    let timed_routes = Router::new()
        .route("/v1/door/unlock", post(handlers::unlock_handler))
        .route("/v1/door/lock", post(handlers::lock_handler))
        .route("/v1/door/status", get(handlers::door_status_handler))
        .route("/v1/door/controller", post(handlers::controller_config_handler))
        .route("/v1/door/logs", get(handlers::logs_handler))
        .route("/health", get(handlers::health_handler))
        .layer(timeout_stack);

    Router::new()
        .route("/v1/scan", post(handlers::scan_handler))
        .merge(timed_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
}
