use crate::error::IngestError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

pub const DEFAULT_WORKERS: usize = 4;

/// Process-wide pool for CPU-bound work (document conversion, embedding).
///
/// At most `size` closures run at once on tokio's blocking threads; callers wait for a
/// permit, so the async side is never blocked by CPU work. Cloning shares the same permits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        info!(workers = size, "worker pool started");
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn run<F, T>(&self, task: F) -> Result<T, IngestError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| IngestError::WorkerPool("pool is shut down".to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        })
        .await
        .map_err(|error| IngestError::WorkerPool(format!("worker task failed: {error}")))
    }

    /// Rejects new work; tasks already holding a permit run to completion.
    pub fn shutdown(&self) {
        if !self.permits.is_closed() {
            self.permits.close();
            info!(workers = self.size, "worker pool shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.permits.is_closed()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrency_is_bounded_by_pool_size() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles = (0..6)
            .map(|_| {
                let pool = pool.clone();
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    pool.run(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.await.expect("join").expect("task should run");
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn work_after_shutdown_is_rejected() {
        let pool = WorkerPool::new(1);
        assert_eq!(pool.run(|| 2 + 2).await.unwrap(), 4);

        pool.shutdown();
        assert!(pool.is_shut_down());
        assert!(matches!(pool.run(|| ()).await, Err(IngestError::WorkerPool(_))));
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let pool = WorkerPool::new(1);
        let result: Result<(), IngestError> = pool.run(|| panic!("boom")).await;
        assert!(matches!(result, Err(IngestError::WorkerPool(_))));
    }
}
