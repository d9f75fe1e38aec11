//! Foodlab Store - concurrent self-expiring state for a recipe service
//!
//! Bounded TTL lookup caches with LRU eviction and prefix invalidation, a
//! registry of background jobs whose results expire after completion, and
//! per-URL visit counters, exposed over HTTP.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod tasks;
pub mod visits;

pub use api::{create_router, AppState};
pub use cache::{BoundedTtlCache, CacheStats, EntryStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Result, StoreError};
pub use jobs::{AsyncJobRegistry, JobStatus, LogJobs};
pub use tasks::{spawn_sweep_task, Sweep};
pub use visits::VisitCounter;
