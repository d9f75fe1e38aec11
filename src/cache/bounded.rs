//! Bounded TTL Cache Module
//!
//! Query-result cache with a fixed entry count, optional time-to-live,
//! least-recently-used eviction and prefix invalidation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CachePolicy, CacheStats, Entry, EntryStore, Lookup};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::tasks::Sweep;

// == Bounded TTL Cache ==
/// Memoizes expensive results behind string keys.
///
/// Keys are sanitized before every operation: characters outside
/// `[A-Za-z0-9_:.-]` become `_`, so `"recipe name"` and `"recipe_name"` share
/// an entry.
#[derive(Debug)]
pub struct BoundedTtlCache<V> {
    name: String,
    store: EntryStore<V, CachePolicy>,
}

impl<V: Clone> BoundedTtlCache<V> {
    // == Constructors ==
    /// Creates a cache on the system clock.
    ///
    /// # Arguments
    /// * `name` - Label used in log events
    /// * `max_entries` - Maximum number of entries, at least 1
    /// * `ttl` - Maximum entry age, None = entries only leave by eviction or removal
    pub fn new(name: impl Into<String>, max_entries: usize, ttl: Option<Duration>) -> Self {
        Self::with_clock(name, max_entries, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: impl Into<String>,
        max_entries: usize,
        ttl: Option<Duration>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = CachePolicy::new(max_entries.max(1), ttl);
        Self {
            name: name.into(),
            store: EntryStore::new(policy, clock),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> CachePolicy {
        *self.store.policy()
    }

    // == Put ==
    /// Inserts or overwrites `key`, resetting its age and making it most
    /// recently used. May evict the least recently used entry.
    pub fn put(&self, key: &str, value: V) -> Result<()> {
        let key = sanitize_key(key)?;
        let evicted = self
            .store
            .insert(key.clone(), Entry::ready(value, self.store.now()));

        for old in evicted {
            info!(cache = %self.name, key = %old, "Evicted least recently used entry");
        }
        debug!(cache = %self.name, key = %key, "Cached entry");
        Ok(())
    }

    // == Get ==
    /// Returns the value if present and unexpired, promoting it to most
    /// recently used. An expired entry is removed and reads as a miss.
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        let key = sanitize_key(key)?;
        let value = match self.store.get_with(&key, |entry, _| entry.value().cloned()) {
            Lookup::Hit(value) => {
                debug!(cache = %self.name, key = %key, "Cache hit");
                value
            }
            Lookup::Expired => {
                info!(cache = %self.name, key = %key, "Dropped expired entry");
                None
            }
            Lookup::Missing => {
                debug!(cache = %self.name, key = %key, "Cache miss");
                None
            }
        };
        Ok(value)
    }

    // == Remove ==
    /// Deletes `key` if present. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let key = sanitize_key(key)?;
        if self.store.remove(&key).is_some() {
            debug!(cache = %self.name, key = %key, "Removed entry");
        } else {
            debug!(cache = %self.name, key = %key, "Remove of absent key ignored");
        }
        Ok(())
    }

    /// Deletes every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_by_prefix(&self, prefix: &str) -> Result<usize> {
        let prefix = sanitize_key(prefix)?;
        let removed = self.store.remove_by_prefix(&prefix);
        info!(cache = %self.name, prefix = %prefix, removed, "Invalidated entries by prefix");
        Ok(removed)
    }

    // == Contains ==
    /// True iff `key` is present and unexpired. Does not affect recency.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let key = sanitize_key(key)?;
        Ok(self.store.contains(&key))
    }

    pub fn size(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Flushes the whole cache.
    pub fn remove_all(&self) {
        let removed = self.store.clear();
        info!(cache = %self.name, removed, "Cache flushed");
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        self.store.sweep()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

impl<V: Clone + Send + 'static> Sweep for BoundedTtlCache<V> {
    fn label(&self) -> &str {
        &self.name
    }

    fn sweep(&self) -> usize {
        self.cleanup_expired()
    }
}

// == Key Sanitization ==
/// Replaces characters outside `[A-Za-z0-9_:.-]` with `_`.
///
/// Only the empty key is rejected; length is unbounded.
pub fn sanitize_key(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument(
            "Cache key must not be empty".to_string(),
        ));
    }

    Ok(key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect())
}
