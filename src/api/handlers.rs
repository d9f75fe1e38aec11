//! API Handlers
//!
//! HTTP request handlers that consume the caches, the log job registry and
//! the visit counter.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::cache::BoundedTtlCache;
use crate::config::Config;
use crate::error::Result;
use crate::jobs::{Artifact, AsyncJobRegistry, LogJobs, LogSource};
use crate::models::{
    CacheStatsResponse, HealthResponse, InvalidateQuery, InvalidateResponse, JobCreatedResponse,
    JobStatusResponse, LogRequestQuery, StatsResponse, VisitCountQuery, VisitCountResponse,
};
use crate::visits::VisitCounter;

/// Cached query results, kept as JSON documents.
pub type JsonCache = BoundedTtlCache<Value>;

/// Application state shared across all handlers.
///
/// Every store is owned here and handed to handlers by reference counting;
/// nothing lives in global state.
#[derive(Clone)]
pub struct AppState {
    /// Single-entity lookups
    pub entity_cache: Arc<JsonCache>,
    /// List query results
    pub query_cache: Arc<JsonCache>,
    /// Background log extraction
    pub log_jobs: LogJobs,
    /// Per-URL request counters
    pub visits: Arc<VisitCounter>,
}

impl AppState {
    /// Creates a new AppState with the given stores.
    pub fn new(entity_cache: JsonCache, query_cache: JsonCache, log_jobs: LogJobs) -> Self {
        Self {
            entity_cache: Arc::new(entity_cache),
            query_cache: Arc::new(query_cache),
            log_jobs,
            visits: Arc::new(VisitCounter::new()),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn from_config(config: &Config) -> Self {
        let entity_cache = JsonCache::new(
            "entity",
            config.entity_cache.max_entries,
            config.entity_cache.ttl,
        );
        let query_cache = JsonCache::new(
            "query",
            config.query_cache.max_entries,
            config.query_cache.ttl,
        );
        let source = LogSource::new(&config.log_file_path).with_delay(config.log_extract_delay);
        let log_jobs = LogJobs::new(AsyncJobRegistry::new("log-jobs", config.jobs), source);

        Self::new(entity_cache, query_cache, log_jobs)
    }

    pub fn caches(&self) -> [&Arc<JsonCache>; 2] {
        [&self.entity_cache, &self.query_cache]
    }
}

/// Middleware counting every request path.
pub async fn track_visits(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.visits.record_visit(request.uri().path());
    next.run(request).await
}

/// Handler for POST /logs/async?date=yyyy-MM-dd
///
/// Starts a log extraction and answers 202 with its task id.
pub async fn request_logs_handler(
    State(state): State<AppState>,
    Query(query): Query<LogRequestQuery>,
) -> Result<(StatusCode, Json<JobCreatedResponse>)> {
    let task_id = state.log_jobs.request_logs(&query.date)?;
    Ok((StatusCode::ACCEPTED, Json(JobCreatedResponse::new(task_id))))
}

/// Handler for GET /logs/async/status/:task_id
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<JobStatusResponse>> {
    let status = state.log_jobs.status(&task_id)?;
    Ok(Json(status.into()))
}

/// Handler for GET /logs/async/file/:task_id
///
/// Streams the extracted log as a text attachment.
pub async fn log_file_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response> {
    let artifact = state.log_jobs.file(&task_id)?;
    Ok(attachment(artifact))
}

/// Handler for GET /logs/:date
///
/// Extracts the day's log while the request waits; 404 when nothing matched.
pub async fn download_logs_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Response> {
    let artifact = state.log_jobs.extract_now(&date).await?;
    Ok(attachment(artifact))
}

fn attachment(artifact: Artifact) -> Response {
    let disposition = format!("attachment; filename={}", artifact.filename);
    let length = artifact.len().to_string();

    (
        [
            (header::CONTENT_TYPE, "text/plain".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, length),
        ],
        artifact.bytes,
    )
        .into_response()
}

/// Handler for GET /api/visits/all
pub async fn all_visits_handler(State(state): State<AppState>) -> Json<BTreeMap<String, u64>> {
    Json(state.visits.all_stats())
}

/// Handler for GET /api/visits/count?url=...
pub async fn visit_count_handler(
    State(state): State<AppState>,
    Query(query): Query<VisitCountQuery>,
) -> Json<VisitCountResponse> {
    let count = state.visits.visit_count(&query.url);
    Json(VisitCountResponse {
        url: query.url,
        count,
    })
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let caches = state
        .caches()
        .iter()
        .map(|cache| StatsResponse::new(cache.name(), &cache.stats()))
        .collect();
    Json(CacheStatsResponse { caches })
}

/// Handler for DELETE /cache?prefix=...
///
/// Invalidates every cached entry derived from a changed upstream entity.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Query(query): Query<InvalidateQuery>,
) -> Result<Json<InvalidateResponse>> {
    let mut removed = 0;
    for cache in state.caches() {
        removed += cache.remove_by_prefix(&query.prefix)?;
    }
    Ok(Json(InvalidateResponse {
        prefix: query.prefix,
        removed,
    }))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
