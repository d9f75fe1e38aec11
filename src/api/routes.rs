//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    all_visits_handler, cache_stats_handler, download_logs_handler, health_handler,
    invalidate_handler, job_status_handler, log_file_handler, request_logs_handler, track_visits,
    visit_count_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /logs/:date` - Download a day's log directly
/// - `POST /logs/async?date=` - Start a log extraction job
/// - `GET /logs/async/status/:task_id` - Poll a job
/// - `GET /logs/async/file/:task_id` - Download the extracted log
/// - `GET /api/visits/all` - Visit counters for every path
/// - `GET /api/visits/count?url=` - Visit counter for one path
/// - `GET /cache/stats` - Cache statistics
/// - `DELETE /cache?prefix=` - Invalidate cached entries by key prefix
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - Visit tracking: counts every request path
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/logs/:date", get(download_logs_handler))
        .route("/logs/async", post(request_logs_handler))
        .route("/logs/async/status/:task_id", get(job_status_handler))
        .route("/logs/async/file/:task_id", get(log_file_handler))
        .route("/api/visits/all", get(all_visits_handler))
        .route("/api/visits/count", get(visit_count_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache", delete(invalidate_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn_with_state(state.clone(), track_visits))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
