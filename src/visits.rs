//! Visit Counter Module
//!
//! Per-URL request counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

// == Visit Counter ==
#[derive(Debug, Default)]
pub struct VisitCounter {
    counters: DashMap<String, AtomicU64>,
}

impl VisitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_visit(&self, url: &str) {
        if let Some(counter) = self.counters.get(url) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry(url.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Visits recorded for `url`, 0 if never seen.
    pub fn visit_count(&self, url: &str) -> u64 {
        self.counters
            .get(url)
            .map(|counter| counter.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Snapshot of every counter, ordered by URL.
    pub fn all_stats(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect()
    }
}
