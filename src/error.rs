//! Error types for the stores
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::jobs::ProducerError;

// == Store Error Enum ==
/// Unified error type for cache and job registry operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Malformed or absent key passed to a cache operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Job id unknown to the registry, or already expired
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Job exists but has not completed yet
    #[error("Job not ready: {0}")]
    NotReady(String),

    /// Job completed successfully but produced no content
    #[error("Job produced no content: {0}")]
    EmptyResult(String),

    /// The job's producer failed while executing
    #[error("Job {job_id} failed")]
    ProducerFailure {
        job_id: String,
        #[source]
        source: Arc<ProducerError>,
    },

    /// A direct log download matched no lines
    #[error("No logs found for {0}")]
    NoLogs(String),

    /// A direct log download failed while reading the files
    #[error("Log extraction for {date} failed")]
    LogExtraction {
        date: String,
        #[source]
        source: Arc<ProducerError>,
    },

    /// The registry no longer accepts work
    #[error("Registry is shutting down")]
    ShuttingDown,
}

// == IntoResponse Implementation ==
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::NotReady(_) => StatusCode::ACCEPTED,
            StoreError::EmptyResult(_) => return StatusCode::NO_CONTENT.into_response(),
            StoreError::NoLogs(_) => StatusCode::NOT_FOUND,
            StoreError::ProducerFailure { .. } | StoreError::LogExtraction { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StoreError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StoreError::InvalidArgument("k".into()), StatusCode::BAD_REQUEST),
            (StoreError::NotFound("id".into()), StatusCode::NOT_FOUND),
            (StoreError::NotReady("id".into()), StatusCode::ACCEPTED),
            (StoreError::EmptyResult("id".into()), StatusCode::NO_CONTENT),
            (StoreError::NoLogs("2024-03-01".into()), StatusCode::NOT_FOUND),
            (StoreError::ShuttingDown, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_producer_failure_keeps_cause() {
        let error = StoreError::ProducerFailure {
            job_id: "abc".to_string(),
            source: Arc::new(ProducerError::Interrupted),
        };

        assert_eq!(error.to_string(), "Job abc failed");
        let cause = error.source().map(|s| s.to_string());
        assert_eq!(cause.as_deref(), Some("Producer was interrupted"));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
