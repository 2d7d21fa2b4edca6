//! Bounded worker pool.
//!
//! Jobs are spawned as tokio tasks that first acquire a semaphore permit, so
//! at most `capacity` of them run at once no matter how many are submitted.
//! The `active`/`pending` counters live in a `watch` channel: each admission
//! or completion is a single `send_modify`, and waiters observe transitions
//! without polling.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use batchjpg_core::{Error, Result};
use serde::Serialize;
use tokio::sync::{watch, Semaphore};

/// Snapshot of the pool's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolCounts {
    /// Jobs currently holding a worker slot.
    pub active: usize,
    /// Jobs submitted but still waiting for a slot.
    pub pending: usize,
}

impl PoolCounts {
    pub fn is_idle(&self) -> bool {
        self.active == 0 && self.pending == 0
    }

    pub fn outstanding(&self) -> usize {
        self.active + self.pending
    }
}

/// Number of logical cores on this host.
pub fn available_parallelism() -> usize {
    num_cpus::get()
}

struct Inner {
    capacity: usize,
    permits: Arc<Semaphore>,
    counts: watch::Sender<PoolCounts>,
    panicked: AtomicUsize,
}

impl Inner {
    fn admit(&self) {
        let capacity = self.capacity;
        self.counts.send_modify(|c| {
            debug_assert!(c.pending > 0, "admitting a job that was never submitted");
            c.pending = c.pending.saturating_sub(1);
            c.active += 1;
            debug_assert!(c.active <= capacity, "active {} exceeds capacity {}", c.active, capacity);
        });
    }

    fn abandon(&self) {
        self.counts
            .send_modify(|c| c.pending = c.pending.saturating_sub(1));
    }

    fn complete(&self) {
        self.counts.send_modify(|c| {
            debug_assert!(c.active > 0, "completing a job that was never admitted");
            c.active = c.active.saturating_sub(1);
        });
    }
}

/// Fixed-capacity pool of concurrent job slots.
///
/// Cloning is cheap; clones share the same slots and counters.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl WorkerPool {
    /// Create a pool with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (counts, _) = watch::channel(PoolCounts::default());
        Self {
            inner: Arc::new(Inner {
                capacity,
                permits: Arc::new(Semaphore::new(capacity)),
                counts,
                panicked: AtomicUsize::new(0),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn counts(&self) -> PoolCounts {
        *self.inner.counts.borrow()
    }

    /// Queue a job. Returns immediately; the job starts once a slot frees up.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.counts.send_modify(|c| c.pending += 1);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let permit = match Arc::clone(&inner.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Worker pool semaphore closed; dropping job");
                    inner.abandon();
                    return;
                }
            };
            inner.admit();

            // Run the job in its own task so a panic is caught here and the
            // slot is still released.
            if let Err(e) = tokio::spawn(job).await {
                if e.is_panic() {
                    inner.panicked.fetch_add(1, Ordering::SeqCst);
                    tracing::error!(error = %e, "Job panicked");
                } else {
                    tracing::warn!(error = %e, "Job was cancelled");
                }
            }

            inner.complete();
            drop(permit);
        });
    }

    /// Wait until `incoming` more jobs fit under `limit` outstanding jobs.
    ///
    /// An empty pool always has room, so a batch larger than `limit` is never
    /// blocked forever.
    pub async fn wait_for_room(&self, limit: usize, incoming: usize) {
        let mut rx = self.inner.counts.subscribe();
        let _ = rx
            .wait_for(|c| c.outstanding() == 0 || c.outstanding() + incoming <= limit)
            .await;
    }

    /// Wait until no job is pending or running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutdownWait`] if any job panicked, since its outcome
    /// was never recorded.
    pub async fn await_idle(&self) -> Result<PoolCounts> {
        let mut rx = self.inner.counts.subscribe();
        let counts = *rx
            .wait_for(PoolCounts::is_idle)
            .await
            .map_err(|_| Error::ShutdownWait("worker pool state channel closed".into()))?;

        let panicked = self.inner.panicked.load(Ordering::SeqCst);
        if panicked > 0 {
            return Err(Error::ShutdownWait(format!("{panicked} job(s) panicked")));
        }
        Ok(counts)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.inner.capacity)
            .field("counts", &self.counts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn capacity_has_floor_of_one() {
        assert_eq!(WorkerPool::new(0).capacity(), 1);
        assert_eq!(WorkerPool::new(5).capacity(), 5);
    }

    #[tokio::test]
    async fn idle_pool_returns_immediately() {
        let pool = WorkerPool::new(2);
        let counts = pool.await_idle().await.unwrap();
        assert!(counts.is_idle());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_capacity_under_bursts() {
        let pool = WorkerPool::new(3);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for burst in 0..4 {
            for _ in 0..25 {
                let current = current.clone();
                let peak = peak.clone();
                let done = done.clone();
                pool.submit(async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    done.fetch_add(1, Ordering::SeqCst);
                });
            }
            if burst % 2 == 0 {
                tokio::task::yield_now().await;
            }
        }

        let counts = pool.await_idle().await.unwrap();
        assert_eq!(counts, PoolCounts::default());
        assert_eq!(done.load(Ordering::SeqCst), 100);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn submit_does_not_block_the_caller() {
        let pool = WorkerPool::new(1);
        let gate = Arc::new(Semaphore::new(0));

        for _ in 0..10 {
            let gate = gate.clone();
            pool.submit(async move {
                let _ = gate.acquire().await;
            });
        }
        assert_eq!(pool.counts().outstanding(), 10);

        gate.add_permits(10);
        pool.await_idle().await.unwrap();
        assert!(pool.counts().is_idle());
    }

    #[tokio::test]
    async fn wait_for_room_blocks_until_jobs_drain() {
        let pool = WorkerPool::new(1);
        let gate = Arc::new(Semaphore::new(0));
        for _ in 0..3 {
            let gate = gate.clone();
            pool.submit(async move {
                gate.acquire().await.unwrap().forget();
            });
        }

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), pool.wait_for_room(3, 2)).await;
        assert!(blocked.is_err(), "room reported while 3 jobs outstanding");

        gate.add_permits(3);
        tokio::time::timeout(Duration::from_secs(5), pool.wait_for_room(3, 2))
            .await
            .expect("room never became available");
    }

    #[tokio::test]
    async fn oversized_batch_proceeds_on_empty_pool() {
        let pool = WorkerPool::new(1);
        tokio::time::timeout(Duration::from_secs(1), pool.wait_for_room(2, 10))
            .await
            .expect("empty pool must always have room");
    }

    #[tokio::test]
    async fn panicking_job_fails_idle_wait_but_frees_slot() {
        let pool = WorkerPool::new(1);
        let done = Arc::new(AtomicUsize::new(0));

        pool.submit(async { panic!("boom") });
        let after = done.clone();
        pool.submit(async move {
            after.fetch_add(1, Ordering::SeqCst);
        });

        let err = pool.await_idle().await.unwrap_err();
        assert!(matches!(err, Error::ShutdownWait(_)));
        assert!(err.to_string().contains("1 job(s) panicked"));
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(pool.counts().is_idle());
    }
}
