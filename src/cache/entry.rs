//! Entry Module
//!
//! Defines the record stored behind every key, for caches and jobs alike.

// == Entry ==
/// A stored value with the timestamps the eviction policies consult.
///
/// `value` and `completed_at` are only ever set together through
/// [`Entry::complete`], so an entry holding a value always has a completion
/// time and an entry without one is still pending.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    value: Option<V>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read or write (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Completion timestamp (Unix milliseconds), None = still pending
    pub completed_at: Option<u64>,
}

impl<V> Entry<V> {
    // == Constructors ==
    /// Creates an entry that has no value yet.
    pub fn pending(now: u64) -> Self {
        Self {
            value: None,
            created_at: now,
            last_accessed_at: now,
            completed_at: None,
        }
    }

    /// Creates an entry whose value is available immediately.
    pub fn ready(value: V, now: u64) -> Self {
        let mut entry = Self::pending(now);
        entry.complete(value, now);
        entry
    }

    // == Complete ==
    /// Stores the value and stamps the completion time.
    ///
    /// Returns `false` without touching the entry if it was already complete.
    pub fn complete(&mut self, value: V, now: u64) -> bool {
        if self.completed_at.is_some() {
            return false;
        }
        self.value = Some(value);
        self.completed_at = Some(now);
        true
    }

    // == Accessors ==
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Age in milliseconds relative to `now`.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    pub(crate) fn touch(&mut self, now: u64) {
        self.last_accessed_at = now;
    }
}
