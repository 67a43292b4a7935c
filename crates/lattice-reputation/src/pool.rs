// crates/lattice-reputation/src/pool.rs
//
// Bounded worker pool for per-peer EigenTrust computations.
//
// The pool is a fixed number of permits created once for the calculator's
// lifetime. Each iteration opens a `Batch`: `submit` waits for a free permit
// before spawning (the bounded queue), and `wait` joins every spawned task
// (the completion barrier).

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use lattice_core::LatticeError;

/// A fixed-size pool of concurrent task slots.
#[derive(Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `size` tasks at once.
    pub fn new(size: usize) -> Result<Self, LatticeError> {
        if size == 0 {
            return Err(LatticeError::Config(
                "worker pool size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.size.saturating_sub(self.permits.available_permits())
    }

    /// Stop accepting new tasks. Tasks already running are not interrupted.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Open a fan-out scope whose tasks share this pool's slots.
    pub fn batch<T: Send + 'static>(&self) -> Batch<T> {
        Batch {
            permits: self.permits.clone(),
            tasks: JoinSet::new(),
        }
    }
}

/// Tasks submitted for one fan-out, awaited together with [`Batch::wait`].
///
/// Dropping a batch without waiting aborts its tasks.
pub struct Batch<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> Batch<T> {
    /// Spawn `task` once a pool slot is free.
    ///
    /// Fails with `PoolClosed` if the pool was closed; tasks submitted
    /// earlier keep running and must still be awaited.
    pub async fn submit<F>(&mut self, task: F) -> Result<(), LatticeError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LatticeError::PoolClosed)?;

        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
        Ok(())
    }

    /// Number of tasks submitted and not yet joined.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every submitted task to finish.
    pub async fn wait(mut self) -> BatchReport<T> {
        let mut report = BatchReport {
            outputs: Vec::with_capacity(self.tasks.len()),
            panicked: 0,
        };
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(output) => report.outputs.push(output),
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    report.panicked += 1;
                }
            }
        }
        report
    }
}

/// Outcome of a completed batch.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Outputs of the tasks that ran to completion, in completion order.
    pub outputs: Vec<T>,
    /// Tasks that panicked or were cancelled by the runtime.
    pub panicked: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn zero_sized_pool_is_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(LatticeError::Config(_))));
    }

    #[tokio::test]
    async fn wait_joins_every_task() {
        let pool = WorkerPool::new(3).unwrap();
        let mut batch = pool.batch();
        for i in 0..20u32 {
            batch.submit(async move { i * 2 }).await.unwrap();
        }
        let report = batch.wait().await;
        assert_eq!(report.panicked, 0);
        let mut outputs = report.outputs;
        outputs.sort();
        assert_eq!(outputs, (0..20).map(|i| i * 2).collect::<Vec<_>>());
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_pool_size() {
        let pool = WorkerPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut batch = pool.batch();
        for _ in 0..10 {
            let running = running.clone();
            let peak = peak.clone();
            batch
                .submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
        }
        batch.wait().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn panicking_task_is_counted_not_propagated() {
        let pool = WorkerPool::new(2).unwrap();
        let mut batch = pool.batch();
        batch.submit(async { 1u8 }).await.unwrap();
        batch
            .submit(async {
                if true {
                    panic!("boom");
                }
                2u8
            })
            .await
            .unwrap();
        let report = batch.wait().await;
        assert_eq!(report.outputs, vec![1u8]);
        assert_eq!(report.panicked, 1);
    }

    #[tokio::test]
    async fn closed_pool_rejects_submissions() {
        let pool = WorkerPool::new(1).unwrap();
        pool.close();
        assert!(pool.is_closed());
        let mut batch = pool.batch::<()>();
        let err = batch.submit(async {}).await.unwrap_err();
        assert!(matches!(err, LatticeError::PoolClosed));
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn pool_is_reused_across_batches() {
        let pool = WorkerPool::new(2).unwrap();
        for round in 0..3u32 {
            let mut batch = pool.batch();
            batch.submit(async move { round }).await.unwrap();
            let report = batch.wait().await;
            assert_eq!(report.outputs, vec![round]);
        }
        assert_eq!(pool.in_flight(), 0);
    }
}
