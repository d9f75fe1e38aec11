//! Eviction Policy Module
//!
//! Decides when an entry stops being visible and how many entries a store may hold.

use std::time::Duration;

use crate::cache::Entry;

// == Eviction Policy ==
/// Consulted by [`EntryStore`](crate::cache::EntryStore) on every lookup,
/// insert and sweep.
pub trait EvictionPolicy: Send + Sync {
    /// Maximum number of entries, None = unbounded.
    fn capacity(&self) -> Option<usize>;

    /// Whether `entry` must no longer be served at time `now`.
    fn is_expired<V>(&self, entry: &Entry<V>, now: u64) -> bool;

    /// Milliseconds left before `entry` expires, None = not scheduled.
    fn remaining_ms<V>(&self, entry: &Entry<V>, now: u64) -> Option<u64>;
}

// == Cache Policy ==
/// Fixed capacity with an optional age limit measured from creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_entries: usize,
    pub ttl: Option<Duration>,
}

impl CachePolicy {
    pub fn new(max_entries: usize, ttl: Option<Duration>) -> Self {
        Self { max_entries, ttl }
    }
}

impl EvictionPolicy for CachePolicy {
    fn capacity(&self) -> Option<usize> {
        Some(self.max_entries)
    }

    /// Expired once strictly older than the TTL.
    fn is_expired<V>(&self, entry: &Entry<V>, now: u64) -> bool {
        match self.ttl {
            Some(ttl) => entry.age_ms(now) > ttl.as_millis() as u64,
            None => false,
        }
    }

    fn remaining_ms<V>(&self, entry: &Entry<V>, now: u64) -> Option<u64> {
        self.ttl
            .map(|ttl| (ttl.as_millis() as u64).saturating_sub(entry.age_ms(now)))
    }
}

// == Completion Policy ==
/// Unbounded; an entry expires a fixed time after it completes and never
/// while it is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionPolicy {
    pub result_ttl: Duration,
}

impl CompletionPolicy {
    pub fn new(result_ttl: Duration) -> Self {
        Self { result_ttl }
    }

    /// The instant an entry completed at `completed_at` stops being visible.
    pub fn expires_at(&self, completed_at: u64) -> u64 {
        completed_at.saturating_add(self.result_ttl.as_millis() as u64)
    }
}

impl EvictionPolicy for CompletionPolicy {
    fn capacity(&self) -> Option<usize> {
        None
    }

    fn is_expired<V>(&self, entry: &Entry<V>, now: u64) -> bool {
        entry
            .completed_at
            .is_some_and(|done| now > self.expires_at(done))
    }

    fn remaining_ms<V>(&self, entry: &Entry<V>, now: u64) -> Option<u64> {
        entry
            .completed_at
            .map(|done| self.expires_at(done).saturating_sub(now))
    }
}
