//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch stamps the key with the next value of a monotonic counter.
/// The smallest stamp is the least recently used key, so two keys can never
/// tie and keys never touched again keep their insertion order.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Key -> current stamp
    stamps: HashMap<String, u64>,
    /// Stamp -> key, oldest first
    order: BTreeMap<u64, String>,
    next_stamp: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, adding it if new.
    pub fn touch(&mut self, key: &str) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;

        match self.stamps.get_mut(key) {
            Some(old) => {
                self.order.remove(old);
                *old = stamp;
            }
            None => {
                self.stamps.insert(key.to_string(), stamp);
            }
        }
        self.order.insert(stamp, key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.order.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.values().next()
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.stamps.contains_key(key)
    }
}
