//! Parallel test execution
//!
//! A fixed pool of worker tasks drains one shared backlog of test cases and
//! reports each finished record over a channel, first finished first reported.

use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use super::runner::CaseRunner;
use crate::models::{CaseRecord, TestCase};

/// Bounded-parallel executor
pub struct ParallelExecutor {
    workers: usize,
}

impl ParallelExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every case, calling `on_complete` once per finished record.
    ///
    /// Returns after all workers have joined.
    pub async fn run<F>(&self, runner: Arc<CaseRunner>, cases: Vec<TestCase>, mut on_complete: F)
    where
        F: FnMut(CaseRecord),
    {
        let pool = self.workers.min(cases.len());
        if pool == 0 {
            return;
        }
        info!("Starting {} workers for {} test cases", pool, cases.len());

        let backlog = Arc::new(Mutex::new(VecDeque::from(cases)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handles: Vec<_> = (0..pool)
            .map(|worker| {
                let backlog = Arc::clone(&backlog);
                let runner = Arc::clone(&runner);
                let tx = tx.clone();

                tokio::spawn(async move {
                    loop {
                        let next = backlog.lock().await.pop_front();
                        let Some(case) = next else {
                            break;
                        };

                        debug!(worker, case_id = %case.id, "Worker picked up test case");
                        let record = runner.run_case(&case).await;
                        if tx.send(record).is_err() {
                            break;
                        }
                    }
                    debug!(worker, "Worker finished");
                })
            })
            .collect();

        // Only the workers hold senders now, so the channel closes when they finish.
        drop(tx);

        while let Some(record) = rx.recv().await {
            on_complete(record);
        }

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Worker task failed: {}", e);
            }
        }
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::FakeInvoker;
    use crate::results::ResultPersister;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use tempfile::tempdir;

    fn cases(n: usize) -> Vec<TestCase> {
        (1..=n)
            .map(|i| TestCase::new(i.to_string(), "agent", "case", format!("prompt {i}")))
            .collect()
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        assert_eq!(ParallelExecutor::new(0).workers(), 1);
        assert_eq!(ParallelExecutor::new(8).workers(), 8);
    }

    #[tokio::test]
    async fn test_every_case_reported_once_for_any_pool_size() {
        let dir = tempdir().unwrap();
        let persister = Arc::new(ResultPersister::new(dir.path()).unwrap());
        let invoker = Arc::new(FakeInvoker {
            delay: Some(Duration::from_millis(5)),
        });
        let runner = Arc::new(CaseRunner::new(invoker, persister, Duration::from_secs(5)));

        for workers in [1, 2, 3, 7, 20] {
            let mut seen = Vec::new();
            ParallelExecutor::new(workers)
                .run(Arc::clone(&runner), cases(7), |record| seen.push(record.id))
                .await;

            assert_eq!(seen.len(), 7, "workers = {workers}");
            let unique: BTreeSet<_> = seen.iter().cloned().collect();
            assert_eq!(unique.len(), 7, "workers = {workers}");
        }
    }

    #[tokio::test]
    async fn test_empty_backlog_returns_immediately() {
        let dir = tempdir().unwrap();
        let persister = Arc::new(ResultPersister::new(dir.path()).unwrap());
        let runner = Arc::new(CaseRunner::new(
            Arc::new(FakeInvoker::default()),
            persister,
            Duration::from_secs(5),
        ));

        let mut calls = 0;
        ParallelExecutor::default().run(runner, Vec::new(), |_| calls += 1).await;
        assert_eq!(calls, 0);
    }
}
