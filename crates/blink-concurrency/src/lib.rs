//! Bounded-concurrency worker pool (C2): run a batch of nullary tasks with
//! at most `N` in flight, wait for all of them, propagate nothing back.
//! Tasks encapsulate their own effects; cancellation and result collection
//! are deliberately out of scope, mirroring the supervisor's "fire and
//! account for completion" usage.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A fixed-size pool of execution slots.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// `n` is the maximum number of tasks allowed to run concurrently.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "worker pool must have at least one slot");
        Self {
            permits: Arc::new(Semaphore::new(n)),
        }
    }

    /// Runs every task in `tasks` with at most `n` in flight, returning
    /// once all of them have completed. A panicking task is awaited like
    /// any other completion; the panic is resumed after every other task
    /// has had a chance to finish, rather than aborting the batch early.
    pub async fn execute<I, F>(&self, tasks: I)
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = ()> + Send + 'static,
    {
        let mut joins = JoinSet::new();
        for task in tasks {
            let permits = self.permits.clone();
            joins.spawn(async move {
                let _permit = permits.acquire_owned().await.expect("semaphore never closes");
                task.await;
            });
        }

        let mut first_panic = None;
        while let Some(result) = joins.join_next().await {
            if let Err(join_error) = result {
                if join_error.is_panic() && first_panic.is_none() {
                    first_panic = Some(join_error);
                }
            }
        }
        if let Some(join_error) = first_panic {
            std::panic::resume_unwind(join_error.into_panic());
        }
    }

    /// Slots currently available (not in use).
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn runs_all_tasks_to_completion() {
        let pool = WorkerPool::new(4);
        let completed = Arc::new(AtomicUsize::new(0));
        let tasks = (0..20).map(|_| {
            let completed = completed.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                completed.fetch_add(1, Ordering::SeqCst);
            }
        });
        pool.execute(tasks).await;
        assert_eq!(completed.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn never_exceeds_n_concurrent_tasks() {
        let pool = WorkerPool::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));
        let tasks = (0..30).map(|_| {
            let in_flight = in_flight.clone();
            let max_observed = max_observed.clone();
            async move {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_observed.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        });
        pool.execute(tasks).await;
        assert!(max_observed.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn empty_batch_completes_immediately() {
        let pool = WorkerPool::new(2);
        pool.execute(Vec::<std::pin::Pin<Box<dyn Future<Output = ()> + Send>>>::new())
            .await;
    }
}
