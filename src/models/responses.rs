//! Response DTOs for the HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::jobs::{ExpiresIn, JobStatus};

/// Response body for POST /logs/async
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreatedResponse {
    pub task_id: String,
}

impl JobCreatedResponse {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

/// Response body for GET /logs/async/status/:task_id
///
/// `expiresIn` is a number of seconds once the job has completed and the
/// string `"will be defined"` while it is still running.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub is_completed: bool,
    pub expires_in: ExpiresIn,
}

impl From<JobStatus> for JobStatusResponse {
    fn from(status: JobStatus) -> Self {
        Self {
            is_completed: status.completed,
            expires_in: status.expires_in,
        }
    }
}

/// Statistics of one cache instance
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Cache instance name
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(name: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            name: name.into(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for GET /cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub caches: Vec<StatsResponse>,
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub prefix: String,
    /// Entries removed across all caches
    pub removed: usize,
}

/// Response body for GET /api/visits/count
#[derive(Debug, Clone, Serialize)]
pub struct VisitCountResponse {
    pub url: String,
    pub count: u64,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
