//! Request DTOs for the HTTP surface
//!
//! Defines the query strings accepted by the endpoints.

use serde::Deserialize;

/// Query for POST /logs/async
#[derive(Debug, Clone, Deserialize)]
pub struct LogRequestQuery {
    /// Day to extract, `yyyy-MM-dd`
    pub date: String,
}

/// Query for GET /api/visits/count
#[derive(Debug, Clone, Deserialize)]
pub struct VisitCountQuery {
    pub url: String,
}

/// Query for DELETE /cache
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateQuery {
    /// Key prefix to invalidate, e.g. `recipe:`
    pub prefix: String,
}
