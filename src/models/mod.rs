//! Request and Response models for the HTTP surface
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing query strings and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{InvalidateQuery, LogRequestQuery, VisitCountQuery};
pub use responses::{
    CacheStatsResponse, HealthResponse, InvalidateResponse, JobCreatedResponse,
    JobStatusResponse, StatsResponse, VisitCountResponse,
};
