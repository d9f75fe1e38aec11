//! Entry Store Module
//!
//! Generic thread-safe map combining HashMap storage with LRU tracking and a
//! pluggable eviction policy. Both the lookup caches and the job registry are
//! built on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{CacheStats, Entry, EvictionPolicy, LruTracker};
use crate::clock::Clock;

// == Lookup ==
/// Outcome of a keyed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<R> {
    /// Entry present and visible
    Hit(R),
    /// Entry was present but expired; it has been removed
    Expired,
    /// No entry under this key
    Missing,
}

impl<R> Lookup<R> {
    pub fn hit(self) -> Option<R> {
        match self {
            Lookup::Hit(r) => Some(r),
            Lookup::Expired | Lookup::Missing => None,
        }
    }
}

#[derive(Debug)]
struct StoreState<V> {
    entries: HashMap<String, Entry<V>>,
    lru: LruTracker,
    stats: CacheStats,
}

impl<V> StoreState<V> {
    fn drop_key(&mut self, key: &str) -> Option<Entry<V>> {
        let removed = self.entries.remove(key);
        self.lru.remove(key);
        self.stats.set_total_entries(self.entries.len());
        removed
    }
}

// == Entry Store ==
/// Thread-safe mapping from string keys to [`Entry`] values.
///
/// Every operation runs under one mutex, so operations on a store are
/// linearizable and never observe a half-applied update.
#[derive(Debug)]
pub struct EntryStore<V, P> {
    state: Mutex<StoreState<V>>,
    policy: P,
    clock: Arc<dyn Clock>,
}

impl<V, P: EvictionPolicy> EntryStore<V, P> {
    // == Constructor ==
    pub fn new(policy: P, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                stats: CacheStats::new(),
            }),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    // == Insert ==
    /// Inserts or overwrites the entry under `key`.
    ///
    /// A new key entering a full store first drops the least recently used
    /// entry if it has expired, then evicts least recently used entries until
    /// there is room. Returns the keys evicted for capacity.
    pub fn insert(&self, key: String, mut entry: Entry<V>) -> Vec<String> {
        let now = self.now();
        let mut state = self.state.lock();
        let mut evicted = Vec::new();

        if !state.entries.contains_key(&key) {
            let stale_oldest = state
                .lru
                .peek_oldest()
                .and_then(|oldest| state.entries.get(oldest).map(|e| (oldest, e)))
                .filter(|(_, e)| self.policy.is_expired(*e, now))
                .map(|(oldest, _)| oldest.clone());
            if let Some(oldest) = stale_oldest {
                state.drop_key(&oldest);
                state.stats.record_expirations(1);
            }

            if let Some(capacity) = self.policy.capacity() {
                while state.entries.len() >= capacity {
                    let Some(oldest) = state.lru.evict_oldest() else {
                        break;
                    };
                    state.entries.remove(&oldest);
                    state.stats.record_eviction();
                    evicted.push(oldest);
                }
            }
        }

        entry.touch(now);
        state.entries.insert(key.clone(), entry);
        state.lru.touch(&key);
        let len = state.entries.len();
        state.stats.set_total_entries(len);

        evicted
    }

    // == Get ==
    /// Reads the entry under `key` through `read`, promoting it to most
    /// recently used.
    ///
    /// An expired entry is removed as a side effect and reported as
    /// [`Lookup::Expired`]. `read` receives the time the lookup was judged at.
    pub fn get_with<R>(&self, key: &str, read: impl FnOnce(&Entry<V>, u64) -> R) -> Lookup<R> {
        let now = self.now();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key).map(|e| self.policy.is_expired(e, now)) {
            None => {
                state.stats.record_miss();
                return Lookup::Missing;
            }
            Some(expired) => expired,
        };

        if expired {
            state.drop_key(key);
            state.stats.record_expirations(1);
            state.stats.record_miss();
            return Lookup::Expired;
        }

        state.lru.touch(key);
        state.stats.record_hit();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                Lookup::Hit(read(entry, now))
            }
            None => Lookup::Missing,
        }
    }

    // == Update ==
    /// Mutates the entry under `key` in place without expiry or recency effects.
    ///
    /// Returns None if the key is absent.
    pub fn update<R>(&self, key: &str, write: impl FnOnce(&mut Entry<V>, u64) -> R) -> Option<R> {
        let now = self.now();
        let mut state = self.state.lock();
        state.entries.get_mut(key).map(|entry| write(entry, now))
    }

    // == Contains ==
    /// True iff `key` is present and unexpired. Drops the entry if expired.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.now();
        let mut state = self.state.lock();

        match state.entries.get(key).map(|e| self.policy.is_expired(e, now)) {
            None => false,
            Some(true) => {
                state.drop_key(key);
                state.stats.record_expirations(1);
                false
            }
            Some(false) => true,
        }
    }

    // == Remove ==
    pub fn remove(&self, key: &str) -> Option<Entry<V>> {
        self.state.lock().drop_key(key)
    }

    /// Removes every key starting with `prefix`, returning how many went.
    pub fn remove_by_prefix(&self, prefix: &str) -> usize {
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &doomed {
            state.drop_key(key);
        }
        doomed.len()
    }

    /// Empties the store, returning how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.entries.len();
        state.entries.clear();
        state.lru.clear();
        state.stats.set_total_entries(0);
        count
    }

    // == Sweep ==
    /// Removes all expired entries. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.now();
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| self.policy.is_expired(*entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.drop_key(key);
        }
        state.stats.record_expirations(expired.len());
        expired.len()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachePolicy, CompletionPolicy};
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn cache_store(max: usize, ttl: Option<Duration>) -> (EntryStore<String, CachePolicy>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = EntryStore::new(CachePolicy::new(max, ttl), clock.clone());
        (store, clock)
    }

    fn put(store: &EntryStore<String, CachePolicy>, key: &str, value: &str) -> Vec<String> {
        store.insert(key.to_string(), Entry::ready(value.to_string(), store.now()))
    }

    fn read(store: &EntryStore<String, CachePolicy>, key: &str) -> Option<String> {
        store
            .get_with(key, |entry, _| entry.value().cloned())
            .hit()
            .flatten()
    }

    #[test]
    fn test_insert_and_get() {
        let (store, _) = cache_store(10, None);

        put(&store, "key1", "value1");

        assert_eq!(read(&store, "key1").as_deref(), Some("value1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_with("nope", |_, _| ()), Lookup::Missing);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let (store, _) = cache_store(2, None);

        put(&store, "a", "1");
        put(&store, "b", "2");
        let evicted = put(&store, "a", "3");

        assert!(evicted.is_empty());
        assert_eq!(store.len(), 2);
        assert_eq!(read(&store, "a").as_deref(), Some("3"));
    }

    #[test]
    fn test_capacity_eviction_reports_keys() {
        let (store, _) = cache_store(2, None);

        put(&store, "a", "1");
        put(&store, "b", "2");
        let evicted = put(&store, "c", "3");

        assert_eq!(evicted, vec!["a".to_string()]);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_expired_lookup_removes_entry() {
        let (store, clock) = cache_store(10, Some(Duration::from_secs(1)));

        put(&store, "k", "v");
        clock.advance(1_001);

        assert_eq!(store.get_with("k", |_, _| ()), Lookup::Expired);
        assert_eq!(store.len(), 0);
        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_expired_oldest_dropped_on_insert() {
        let (store, clock) = cache_store(10, Some(Duration::from_secs(1)));

        put(&store, "old", "v");
        clock.advance(500);
        put(&store, "young", "v");
        clock.advance(600);
        put(&store, "new", "v");

        assert_eq!(store.len(), 2);
        assert!(!store.contains("old"));
        assert!(store.contains("young"));
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_contains_does_not_promote() {
        let (store, _) = cache_store(2, None);

        put(&store, "a", "1");
        put(&store, "b", "2");
        assert!(store.contains("a"));
        put(&store, "c", "3");

        assert!(!store.contains("a"));
        assert!(store.contains("b"));
    }

    #[test]
    fn test_remove_by_prefix() {
        let (store, _) = cache_store(10, None);

        put(&store, "r:1", "x");
        put(&store, "r:2", "x");
        put(&store, "s:1", "x");

        assert_eq!(store.remove_by_prefix("r:"), 2);
        assert_eq!(store.len(), 1);
        assert!(store.contains("s:1"));
    }

    #[test]
    fn test_sweep_and_clear() {
        let (store, clock) = cache_store(10, Some(Duration::from_secs(10)));

        put(&store, "a", "1");
        clock.advance(5_000);
        put(&store, "b", "2");
        clock.advance(5_001);

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_completes_pending_entry() {
        let clock = Arc::new(ManualClock::new(0));
        let store: EntryStore<u32, CompletionPolicy> =
            EntryStore::new(CompletionPolicy::new(Duration::from_secs(5)), clock.clone());

        store.insert("job".to_string(), Entry::pending(0));
        clock.advance(100);

        let completed = store.update("job", |entry, now| entry.complete(7, now));
        assert_eq!(completed, Some(true));
        assert_eq!(store.update("missing", |_, _| ()), None);

        let seen = store.get_with("job", |entry, _| (entry.value().copied(), entry.completed_at));
        assert_eq!(seen, Lookup::Hit((Some(7), Some(100))));
    }
}
