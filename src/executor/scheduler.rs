//! Run-level scheduling
//!
//! Dispatches the loaded test cases under the sequential or bounded-parallel
//! policy, reports progress to the console and folds every record into the
//! run summary.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::parallel::ParallelExecutor;
use super::runner::CaseRunner;
use crate::models::{CaseRecord, CaseState, RunSummary, TestCase};
use crate::output::Console;
use crate::results::ResultAggregator;
use crate::utils::Timer;

/// How cases are dispatched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// One at a time, in input order
    Sequential,
    /// A pool of `workers` concurrent slots
    Parallel { workers: usize },
}

impl SchedulePolicy {
    pub fn from_settings(sequential: bool, workers: usize) -> Self {
        if sequential {
            SchedulePolicy::Sequential
        } else {
            SchedulePolicy::Parallel { workers }
        }
    }
}

impl fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulePolicy::Sequential => write!(f, "SEQUENTIAL"),
            SchedulePolicy::Parallel { .. } => write!(f, "PARALLEL"),
        }
    }
}

/// Runs a whole set of test cases
pub struct ExecutionScheduler {
    runner: Arc<CaseRunner>,
    policy: SchedulePolicy,
    console: Console,
}

impl ExecutionScheduler {
    pub fn new(runner: CaseRunner, policy: SchedulePolicy, console: Console) -> Self {
        Self {
            runner: Arc::new(runner),
            policy,
            console,
        }
    }

    /// Run every case exactly once and return the folded summary
    pub async fn run(&self, cases: Vec<TestCase>) -> RunSummary {
        if cases.is_empty() {
            error!("No test cases to execute");
            return RunSummary::empty();
        }

        let total = cases.len();
        let palette = self.console.palette();
        let timer = Timer::start(format!("{} run", self.policy));

        self.console.line(palette.bold(&palette.cyan(&format!(
            "\n🚀 Starting {} execution of {} test cases",
            self.policy, total
        ))));
        match self.policy {
            SchedulePolicy::Sequential => info!("Starting sequential execution of {} test cases", total),
            SchedulePolicy::Parallel { workers } => info!(
                "Starting parallel execution of {} test cases with {} workers",
                total, workers
            ),
        }

        debug!(state = %CaseState::Pending, "Queued {} test cases", total);

        let mut aggregator = ResultAggregator::with_capacity(total);
        match self.policy {
            SchedulePolicy::Sequential => {
                for case in &cases {
                    let record = self.runner.run_case(case).await;
                    self.report(&record);
                    aggregator.push(record);
                    self.console.line(palette.bold(&palette.blue(&format!(
                        "📊 Progress: {}/{}",
                        aggregator.completed(),
                        total
                    ))));
                }
            }
            SchedulePolicy::Parallel { workers } => {
                let executor = ParallelExecutor::new(workers);
                debug!("Worker pool size: {}", executor.workers().min(total));
                executor
                    .run(Arc::clone(&self.runner), cases, |record| {
                        self.report(&record);
                        aggregator.push(record);
                        self.console.line(palette.bold(&palette.blue(&format!(
                            "📊 Progress: {}/{} test cases completed",
                            aggregator.completed(),
                            total
                        ))));
                    })
                    .await;
            }
        }

        if aggregator.completed() != total {
            warn!(
                "Only {} of {} test cases reported a result",
                aggregator.completed(),
                total
            );
        }

        let summary = aggregator.finish();
        timer.stop();

        self.console.line(palette.bold(&palette.green(&format!(
            "\n🎉 {} execution completed: {}/{} successful",
            self.policy, summary.successful, summary.total
        ))));
        info!(
            "{} execution completed: {}/{} successful",
            self.policy, summary.successful, summary.total
        );

        summary
    }

    fn report(&self, record: &CaseRecord) {
        let palette = self.console.palette();
        debug!("{}", record);
        if record.success {
            info!(case_id = %record.id, "✓ Test case {} completed successfully", record.id);
            self.console.line(palette.green(&format!(
                "✅ Test case {} completed successfully",
                record.id
            )));
        } else {
            warn!(case_id = %record.id, "✗ Test case {} failed", record.id);
            self.console.line(palette.red(&format!("❌ Test case {} failed", record.id)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{FakeInvoker, ERROR_AGENT, FAILING_AGENT, PANIC_AGENT, SLOW_AGENT};
    use crate::output::CaptureBuffer;
    use crate::results::ResultPersister;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn case(id: &str, agent: &str) -> TestCase {
        TestCase::new(id, agent, format!("case{id}"), format!("prompt {id}"))
    }

    fn scheduler(dir: &Path, policy: SchedulePolicy, timeout: Duration) -> (ExecutionScheduler, CaptureBuffer) {
        let persister = Arc::new(ResultPersister::new(dir).unwrap());
        let runner = CaseRunner::new(Arc::new(FakeInvoker::default()), persister, timeout);
        let buffer = CaptureBuffer::default();
        let console = Console::from_writer(buffer.clone(), false);
        (ExecutionScheduler::new(runner, policy, console), buffer)
    }

    fn transcript_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "txt").unwrap_or(false))
            .count()
    }

    #[test]
    fn test_policy_from_settings() {
        assert_eq!(SchedulePolicy::from_settings(true, 4), SchedulePolicy::Sequential);
        assert_eq!(
            SchedulePolicy::from_settings(false, 4),
            SchedulePolicy::Parallel { workers: 4 }
        );
        assert_eq!(SchedulePolicy::Parallel { workers: 2 }.to_string(), "PARALLEL");
    }

    #[tokio::test]
    async fn test_parallel_all_succeed() {
        let dir = tempdir().unwrap();
        let (scheduler, _) = scheduler(
            dir.path(),
            SchedulePolicy::Parallel { workers: 2 },
            Duration::from_secs(5),
        );
        let cases = (1..=4).map(|i| case(&i.to_string(), "agent")).collect();

        let summary = scheduler.run(cases).await;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.successful, 4);
        assert_eq!(summary.failed, 0);
        assert!(summary.min_time >= 0.0);
        assert!(summary.total_time >= summary.max_time);
        assert_eq!(transcript_count(dir.path()), 4);
    }

    #[tokio::test]
    async fn test_slow_case_does_not_affect_others() {
        let dir = tempdir().unwrap();
        let (scheduler, _) = scheduler(
            dir.path(),
            SchedulePolicy::Parallel { workers: 2 },
            Duration::from_millis(300),
        );
        let cases = vec![
            case("1", SLOW_AGENT),
            case("2", "agent"),
            case("3", "agent"),
            case("4", "agent"),
        ];

        let summary = scheduler.run(cases).await;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.successful, 3);
        assert_eq!(summary.failed, 1);
        let slow = summary.details.iter().find(|r| r.id == "1").unwrap();
        assert!(!slow.success);
        assert!(slow.elapsed_secs.is_some());
        assert!(summary
            .details
            .iter()
            .filter(|r| r.id != "1")
            .all(|r| r.success));
    }

    #[tokio::test]
    async fn test_sequential_preserves_input_order() {
        let dir = tempdir().unwrap();
        let (scheduler, buffer) = scheduler(dir.path(), SchedulePolicy::Sequential, Duration::from_secs(5));
        let ids = ["9", "2", "7", "2", "5"];
        let cases = ids.iter().map(|id| case(id, "agent")).collect();

        let summary = scheduler.run(cases).await;

        let order: Vec<&str> = summary.details.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, ids);

        let output = buffer.contents();
        assert!(output.contains("🚀 Starting SEQUENTIAL execution of 5 test cases"));
        assert!(output.contains("📊 Progress: 5/5"));
        assert!(output.contains("🎉 SEQUENTIAL execution completed: 5/5 successful"));
    }

    #[tokio::test]
    async fn test_failures_are_contained() {
        let dir = tempdir().unwrap();
        let (scheduler, buffer) = scheduler(
            dir.path(),
            SchedulePolicy::Parallel { workers: 3 },
            Duration::from_secs(5),
        );
        let cases = vec![
            case("1", PANIC_AGENT),
            case("2", ERROR_AGENT),
            case("3", FAILING_AGENT),
            case("4", "agent"),
        ];

        let summary = scheduler.run(cases).await;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.total, summary.successful + summary.failed);

        let caught: Vec<_> = summary.details.iter().filter(|r| r.error.is_some()).collect();
        assert_eq!(caught.len(), 2);
        assert!(caught.iter().all(|r| r.elapsed_secs.is_none() && r.transcript_path.is_none()));

        // Caught failures leave no transcript behind.
        assert_eq!(transcript_count(dir.path()), 2);
        assert!(buffer.contents().contains("📊 Progress: 4/4 test cases completed"));
    }

    #[tokio::test]
    async fn test_policies_agree_on_statistics() {
        let cases: Vec<TestCase> = vec![case("1", "agent"), case("2", FAILING_AGENT), case("3", "agent")];

        let dir = tempdir().unwrap();
        let (sequential, _) = scheduler(dir.path(), SchedulePolicy::Sequential, Duration::from_secs(5));
        let (parallel, _) = scheduler(
            dir.path(),
            SchedulePolicy::Parallel { workers: 3 },
            Duration::from_secs(5),
        );

        let a = sequential.run(cases.clone()).await;
        let b = parallel.run(cases).await;

        assert_eq!((a.total, a.successful, a.failed), (b.total, b.successful, b.failed));
    }

    #[tokio::test]
    async fn test_empty_input_returns_zeroed_summary() {
        let dir = tempdir().unwrap();
        let (scheduler, buffer) = scheduler(
            dir.path(),
            SchedulePolicy::Parallel { workers: 2 },
            Duration::from_secs(5),
        );

        let summary = scheduler.run(Vec::new()).await;

        assert!(summary.is_empty());
        assert_eq!(summary, RunSummary::empty());
        assert!(buffer.contents().is_empty());
    }
}
