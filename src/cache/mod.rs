//! Cache Module
//!
//! Provides the generic entry store and the bounded TTL lookup cache built on it.

mod bounded;
mod entry;
mod lru;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use bounded::{sanitize_key, BoundedTtlCache};
pub use entry::Entry;
pub use lru::LruTracker;
pub use policy::{CachePolicy, CompletionPolicy, EvictionPolicy};
pub use stats::CacheStats;
pub use store::{EntryStore, Lookup};
