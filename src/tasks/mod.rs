//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the stores are live.
//!
//! # Tasks
//! - Sweep: removes expired entries from a store at a fixed interval

mod sweep;

pub use sweep::{spawn_sweep_task, Sweep};
