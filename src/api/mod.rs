//! API Module
//!
//! HTTP handlers and routing for the store's REST surface.
//!
//! # Endpoints
//! - `GET /logs/:date` - Download a day's log directly
//! - `POST /logs/async?date=` - Start a log extraction job
//! - `GET /logs/async/status/:task_id` - Poll a job
//! - `GET /logs/async/file/:task_id` - Download the extracted log
//! - `GET /api/visits/all` - All visit counters
//! - `GET /api/visits/count?url=` - One visit counter
//! - `GET /cache/stats` - Cache statistics
//! - `DELETE /cache?prefix=` - Prefix invalidation
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
