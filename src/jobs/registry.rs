//! Async Job Registry Module
//!
//! Accepts long-running producers, runs them on a bounded worker pool and
//! keeps each outcome readable until a fixed time after completion.
//!
//! Job lifecycle: `PENDING -> SUCCEEDED | FAILED -> REAPED`. A reaped job is
//! indistinguishable from one that never existed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use serde::{Serialize, Serializer};
use tokio::runtime::Handle;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CompletionPolicy, Entry, EntryStore, EvictionPolicy, Lookup};
use crate::clock::{Clock, SystemClock};
use crate::config::JobSettings;
use crate::error::{Result, StoreError};
use crate::jobs::{Interrupt, ProducerError};
use crate::tasks::{spawn_sweep_task, Sweep};

// == Job Status ==
/// Seconds until a job expires, unknown while it is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiresIn {
    Seconds(u64),
    Unknown,
}

impl Serialize for ExpiresIn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ExpiresIn::Seconds(secs) => serializer.serialize_u64(*secs),
            ExpiresIn::Unknown => serializer.serialize_str("will be defined"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub completed: bool,
    pub expires_in: ExpiresIn,
}

/// What a finished producer left behind.
#[derive(Debug, Clone)]
enum Outcome<V> {
    Produced(V),
    Empty,
    Failed(Arc<ProducerError>),
}

impl<V> Outcome<V> {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Produced(_) => "succeeded",
            Outcome::Empty => "succeeded with empty result",
            Outcome::Failed(_) => "failed",
        }
    }
}

struct RegistryInner<V> {
    name: String,
    jobs: EntryStore<Outcome<V>, CompletionPolicy>,
    workers: Arc<Semaphore>,
    accepting: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    runtime: Handle,
}

impl<V: Clone + Send + 'static> RegistryInner<V> {
    /// Records the outcome; the job's expiry is fixed here and only here.
    fn finish(&self, job_id: &str, outcome: Outcome<V>) {
        let label = outcome.label();
        if let Outcome::Failed(error) = &outcome {
            warn!(registry = %self.name, job_id, error = %error, "Job failed");
        }

        match self.jobs.update(job_id, |entry, now| entry.complete(outcome, now)) {
            Some(true) => info!(registry = %self.name, job_id, "Job {}", label),
            Some(false) => warn!(registry = %self.name, job_id, "Job already completed"),
            None => debug!(registry = %self.name, job_id, "Job vanished before completion"),
        }
    }
}

/// Sweep target that does not keep the registry alive.
///
/// Once the last handle is gone the inner state drops, taking the shutdown
/// sender with it, and the sweep task ends.
struct JobSweeper<V> {
    name: String,
    inner: Weak<RegistryInner<V>>,
}

impl<V: Clone + Send + 'static> Sweep for JobSweeper<V> {
    fn label(&self) -> &str {
        &self.name
    }

    fn sweep(&self) -> usize {
        self.inner.upgrade().map_or(0, |inner| inner.jobs.sweep())
    }
}

// == Async Job Registry ==
/// Handle to a job registry; clones share the same jobs.
///
/// Construction spawns the periodic sweep on the current tokio runtime.
/// Call [`shutdown`](Self::shutdown) to stop it and refuse further work.
pub struct AsyncJobRegistry<V> {
    inner: Arc<RegistryInner<V>>,
}

impl<V> Clone for AsyncJobRegistry<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + Send + 'static> AsyncJobRegistry<V> {
    // == Constructors ==
    /// Creates a registry on the system clock.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn new(name: impl Into<String>, settings: JobSettings) -> Self {
        Self::with_clock(name, settings, Arc::new(SystemClock))
    }

    /// Creates a registry whose expiry follows `clock`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn with_clock(name: impl Into<String>, settings: JobSettings, clock: Arc<dyn Clock>) -> Self {
        let runtime = Handle::current();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(RegistryInner {
            name: name.into(),
            jobs: EntryStore::new(CompletionPolicy::new(settings.result_ttl), clock),
            workers: Arc::new(Semaphore::new(settings.max_workers.max(1))),
            accepting: AtomicBool::new(true),
            shutdown_tx,
            runtime,
        });

        let sweeper = JobSweeper {
            name: inner.name.clone(),
            inner: Arc::downgrade(&inner),
        };
        spawn_sweep_task(Arc::new(sweeper), settings.sweep_interval, shutdown_rx);

        Self { inner }
    }

    // == Submit ==
    /// Schedules `producer` and returns its job id without waiting.
    ///
    /// The producer runs on the blocking pool once a worker slot is free. It
    /// returns `Ok(None)` when it finished but had nothing to produce. Errors
    /// and panics are recorded on the job, never returned here.
    pub fn submit<F>(&self, producer: F) -> Result<String>
    where
        F: FnOnce(Interrupt) -> std::result::Result<Option<V>, ProducerError> + Send + 'static,
    {
        if !self.inner.accepting.load(Ordering::SeqCst) {
            return Err(StoreError::ShuttingDown);
        }

        let job_id = Uuid::new_v4().to_string();
        let now = self.inner.jobs.now();
        self.inner.jobs.insert(job_id.clone(), Entry::pending(now));

        let inner = Arc::clone(&self.inner);
        let interrupt = Interrupt::new(self.inner.shutdown_tx.subscribe());
        let id = job_id.clone();
        self.inner.runtime.spawn(async move {
            let outcome = run_producer(Arc::clone(&inner.workers), interrupt, producer).await;
            inner.finish(&id, outcome);
        });

        info!(registry = %self.inner.name, job_id = %job_id, "Job submitted");
        Ok(job_id)
    }

    // == Status ==
    /// Reports whether the job has completed and how long it stays readable.
    ///
    /// Fails with `NotFound` for unknown or expired ids.
    pub fn status(&self, job_id: &str) -> Result<JobStatus> {
        let job_id = job_id.trim();
        let policy = *self.inner.jobs.policy();

        let lookup = self.inner.jobs.get_with(job_id, |entry, now| JobStatus {
            completed: entry.is_complete(),
            expires_in: policy
                .remaining_ms(entry, now)
                .map(|ms| ExpiresIn::Seconds(ms / 1000))
                .unwrap_or(ExpiresIn::Unknown),
        });

        match lookup {
            Lookup::Hit(status) => Ok(status),
            Lookup::Expired | Lookup::Missing => Err(StoreError::NotFound(job_id.to_string())),
        }
    }

    // == Result ==
    /// Returns the produced value. Repeated calls return the same value until
    /// the job expires.
    ///
    /// # Errors
    /// - `NotFound` for unknown or expired ids
    /// - `NotReady` while the producer is still running
    /// - `EmptyResult` if the producer finished with nothing to return
    /// - `ProducerFailure` if the producer failed, with its error as cause
    pub fn result(&self, job_id: &str) -> Result<V> {
        let job_id = job_id.trim();
        let lookup = self
            .inner
            .jobs
            .get_with(job_id, |entry, _| entry.value().cloned());

        match lookup {
            Lookup::Hit(Some(Outcome::Produced(value))) => Ok(value),
            Lookup::Hit(Some(Outcome::Empty)) => Err(StoreError::EmptyResult(job_id.to_string())),
            Lookup::Hit(Some(Outcome::Failed(source))) => Err(StoreError::ProducerFailure {
                job_id: job_id.to_string(),
                source,
            }),
            Lookup::Hit(None) => Err(StoreError::NotReady(job_id.to_string())),
            Lookup::Expired | Lookup::Missing => Err(StoreError::NotFound(job_id.to_string())),
        }
    }

    // == Shutdown ==
    /// Stops accepting work, stops the sweep and interrupts running
    /// producers. Jobs still waiting for a worker fail as interrupted.
    pub fn shutdown(&self) {
        if self.inner.accepting.swap(false, Ordering::SeqCst) {
            self.inner.workers.close();
            // send only fails when every receiver is gone
            let _ = self.inner.shutdown_tx.send(true);
            info!(registry = %self.inner.name, "Job registry shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        !self.inner.accepting.load(Ordering::SeqCst)
    }

    /// Removes expired jobs now, returning how many went.
    pub fn sweep(&self) -> usize {
        self.inner.jobs.sweep()
    }

    /// Number of jobs held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.jobs.is_empty()
    }
}

/// Waits for a worker slot, then runs `producer` on the blocking pool.
async fn run_producer<V, F>(workers: Arc<Semaphore>, interrupt: Interrupt, producer: F) -> Outcome<V>
where
    V: Send + 'static,
    F: FnOnce(Interrupt) -> std::result::Result<Option<V>, ProducerError> + Send + 'static,
{
    let Ok(_permit) = workers.acquire_owned().await else {
        return Outcome::Failed(Arc::new(ProducerError::Interrupted));
    };
    if interrupt.is_interrupted() {
        return Outcome::Failed(Arc::new(ProducerError::Interrupted));
    }

    let handed = interrupt.clone();
    let joined = tokio::task::spawn_blocking(move || producer(handed)).await;

    match joined {
        // whatever it returned, an interrupted run is not a success
        Ok(Ok(_)) if interrupt.is_interrupted() => {
            Outcome::Failed(Arc::new(ProducerError::Interrupted))
        }
        Ok(Ok(Some(value))) => Outcome::Produced(value),
        Ok(Ok(None)) => Outcome::Empty,
        Ok(Err(error)) => Outcome::Failed(Arc::new(error)),
        Err(join_error) => Outcome::Failed(Arc::new(ProducerError::Panicked(join_error.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    const RESULT_TTL: Duration = Duration::from_secs(300);

    fn settings() -> JobSettings {
        JobSettings {
            result_ttl: RESULT_TTL,
            sweep_interval: Duration::from_secs(3600),
            max_workers: 2,
        }
    }

    fn registry() -> (AsyncJobRegistry<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (AsyncJobRegistry::with_clock("test-jobs", settings(), clock.clone()), clock)
    }

    /// Polls until the job leaves the pending state.
    async fn wait_completed(registry: &AsyncJobRegistry<String>, id: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !registry.status(id).unwrap().completed {
            assert!(Instant::now() < deadline, "job {} never completed", id);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_submit_returns_before_producer_finishes() {
        let (registry, _) = registry();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let started = Instant::now();
        let id = registry
            .submit(move |_| {
                release_rx.recv().ok();
                Ok(Some("artifact".to_string()))
            })
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));

        assert!(matches!(registry.result(&id), Err(StoreError::NotReady(_))));
        let status = registry.status(&id).unwrap();
        assert!(!status.completed);
        assert_eq!(status.expires_in, ExpiresIn::Unknown);

        release_tx.send(()).unwrap();
        wait_completed(&registry, &id).await;

        assert_eq!(registry.result(&id).unwrap(), "artifact");
        assert_eq!(registry.result(&id).unwrap(), "artifact");
    }

    #[tokio::test]
    async fn test_job_ids_are_unique_and_trimmed() {
        let (registry, _) = registry();

        let a = registry.submit(|_| Ok(Some("a".to_string()))).unwrap();
        let b = registry.submit(|_| Ok(Some("b".to_string()))).unwrap();
        assert_ne!(a, b);

        wait_completed(&registry, &a).await;
        assert_eq!(registry.result(&format!("  {}\n", a)).unwrap(), "a");
    }

    #[tokio::test]
    async fn test_expiry_counts_from_completion() {
        let (registry, clock) = registry();

        let id = registry.submit(|_| Ok(Some("done".to_string()))).unwrap();
        wait_completed(&registry, &id).await;

        let status = registry.status(&id).unwrap();
        assert_eq!(status.expires_in, ExpiresIn::Seconds(300));

        clock.advance(RESULT_TTL.as_millis() as u64);
        assert_eq!(registry.result(&id).unwrap(), "done");
        assert_eq!(registry.status(&id).unwrap().expires_in, ExpiresIn::Seconds(0));

        clock.advance(1);
        assert!(matches!(registry.status(&id), Err(StoreError::NotFound(_))));
        assert!(matches!(registry.result(&id), Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pending_job_never_expires() {
        let (registry, clock) = registry();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let id = registry
            .submit(move |_| {
                release_rx.recv().ok();
                Ok(Some("late".to_string()))
            })
            .unwrap();

        clock.advance(RESULT_TTL.as_millis() as u64 * 10);
        assert_eq!(registry.sweep(), 0);
        assert!(!registry.status(&id).unwrap().completed);

        release_tx.send(()).unwrap();
        wait_completed(&registry, &id).await;
        assert_eq!(registry.status(&id).unwrap().expires_in, ExpiresIn::Seconds(300));
    }

    #[tokio::test]
    async fn test_sweep_reaps_expired_jobs() {
        let (registry, clock) = registry();

        let id = registry.submit(|_| Ok(Some("x".to_string()))).unwrap();
        wait_completed(&registry, &id).await;
        assert_eq!(registry.len(), 1);

        clock.advance(RESULT_TTL.as_millis() as u64 + 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.sweep(), 1);
        assert!(registry.is_empty());
        assert!(matches!(registry.result(&id), Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_result_is_distinct() {
        let (registry, _) = registry();

        let id = registry.submit(|_| Ok(None)).unwrap();
        wait_completed(&registry, &id).await;

        assert!(registry.status(&id).unwrap().completed);
        assert!(matches!(registry.result(&id), Err(StoreError::EmptyResult(_))));
    }

    #[tokio::test]
    async fn test_producer_error_recorded_as_failure() {
        let (registry, _) = registry();

        let id = registry
            .submit(|_| {
                Err(ProducerError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "denied",
                )))
            })
            .unwrap();
        wait_completed(&registry, &id).await;

        match registry.result(&id) {
            Err(StoreError::ProducerFailure { job_id, source }) => {
                assert_eq!(job_id, id);
                assert!(matches!(*source, ProducerError::Io(_)));
            }
            other => panic!("expected producer failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_producer_panic_recorded_as_failure() {
        let (registry, _) = registry();

        let id = registry
            .submit(|_| -> std::result::Result<Option<String>, ProducerError> {
                panic!("boom")
            })
            .unwrap();
        wait_completed(&registry, &id).await;

        match registry.result(&id) {
            Err(StoreError::ProducerFailure { source, .. }) => {
                assert!(matches!(*source, ProducerError::Panicked(_)));
            }
            other => panic!("expected producer failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_registry_releases_its_state() {
        let (registry, _) = registry();
        let id = registry.submit(|_| Ok(Some("x".to_string()))).unwrap();
        wait_completed(&registry, &id).await;

        let inner = Arc::downgrade(&registry.inner);
        drop(registry);
        tokio::task::yield_now().await;

        assert!(inner.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_not_found() {
        let (registry, _) = registry();

        assert!(matches!(registry.status("nope"), Err(StoreError::NotFound(_))));
        assert!(matches!(registry.result("nope"), Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_and_refuses_work() {
        let (registry, _) = registry();

        let id = registry
            .submit(|interrupt| {
                interrupt.sleep(Duration::from_secs(30))?;
                Ok(Some("never".to_string()))
            })
            .unwrap();
        assert!(matches!(registry.result(&id), Err(StoreError::NotReady(_))));

        registry.shutdown();
        registry.shutdown();
        assert!(registry.is_shut_down());

        wait_completed(&registry, &id).await;
        match registry.result(&id) {
            Err(StoreError::ProducerFailure { source, .. }) => {
                assert!(matches!(*source, ProducerError::Interrupted));
            }
            other => panic!("expected interrupted failure, got {:?}", other),
        }

        let refused = registry.submit(|_| Ok(Some("late".to_string())));
        assert!(matches!(refused, Err(StoreError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_interrupted_success_is_not_recorded_as_success() {
        let (registry, _) = registry();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        // ignores the interrupt and claims success anyway
        let id = registry
            .submit(move |_| {
                release_rx.recv().ok();
                Ok(Some("stale".to_string()))
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.shutdown();
        release_tx.send(()).unwrap();
        wait_completed(&registry, &id).await;

        assert!(matches!(
            registry.result(&id),
            Err(StoreError::ProducerFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_concurrency() {
        let (registry, _) = registry();
        let running = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let peak = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let ids: Vec<String> = (0..6)
            .map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                registry
                    .submit(move |_| {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(30));
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(Some(i.to_string()))
                    })
                    .unwrap()
            })
            .collect();

        for id in &ids {
            wait_completed(&registry, id).await;
        }
        assert!(peak.load(Ordering::SeqCst) <= settings().max_workers);
    }
}
