//! Bounded worker pool
//!
//! Tasks are started in submission order with at most `concurrency` in
//! flight. They run cooperatively on the calling task; nothing is spawned.
//! Every task settles and its output is collected in completion order.

use futures::stream::{self, StreamExt};
use std::future::Future;

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        WorkerPool {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `task` once per item and wait for all of them.
    ///
    /// A task's failure is part of its output; it never cancels siblings.
    pub async fn run<I, F, Fut, T>(&self, items: I, task: F) -> Vec<T>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        stream::iter(items)
            .map(task)
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_concurrency() {
        let pool = WorkerPool::new(30);
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let started = AtomicUsize::new(0);

        let results = pool
            .run(0..100u32, |id| {
                let in_flight = &in_flight;
                let peak = &peak;
                let started = &started;
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10 + u64::from(id % 7))).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    id
                }
            })
            .await;

        assert_eq!(results.len(), 100);
        assert_eq!(started.load(Ordering::SeqCst), 100);
        assert_eq!(peak.load(Ordering::SeqCst), 30);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);

        let mut sorted = results.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failed_task_does_not_stop_siblings() {
        let pool = WorkerPool::new(4);

        let results: Vec<Result<u32, String>> = pool
            .run(1..=10u32, |id| async move {
                if id == 3 {
                    Err(format!("task {id} failed"))
                } else {
                    Ok(id)
                }
            })
            .await;

        assert_eq!(results.len(), 10);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 9);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        assert_eq!(WorkerPool::new(0).concurrency(), 1);
    }
}
