//! Sweep Task
//!
//! Background task that periodically removes expired entries from a store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

// == Sweep Trait ==
/// A store with entries that can expire.
pub trait Sweep: Send + Sync + 'static {
    /// Name used in log events.
    fn label(&self) -> &str;

    /// Removes every expired entry, returning how many were removed.
    fn sweep(&self) -> usize;
}

/// Spawns a background task that sweeps `target` every `interval`.
///
/// The first sweep happens one full interval after spawning. The task stops
/// when `shutdown` turns `true` or its sender is dropped; the returned handle
/// can also be aborted directly.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(BoundedTtlCache::<String>::new("recipes", 5, Some(ttl)));
/// let (tx, rx) = watch::channel(false);
/// let handle = spawn_sweep_task(cache.clone(), Duration::from_secs(60), rx);
/// // Later, during shutdown:
/// let _ = tx.send(true);
/// ```
pub fn spawn_sweep_task(
    target: Arc<dyn Sweep>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            store = target.label(),
            "Starting sweep task with interval of {:?}", interval
        );

        // tokio rejects a zero period
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        // interval() fires immediately; the first sweep waits a full period
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = target.sweep();
                    if removed > 0 {
                        info!(store = target.label(), "Sweep: removed {} expired entries", removed);
                    } else {
                        debug!(store = target.label(), "Sweep: no expired entries found");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(store = target.label(), "Sweep task stopped");
    })
}
