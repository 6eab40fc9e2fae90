//! Per-case execution
//!
//! Runs one test case through the invoker, writes its transcript and turns
//! the outcome into a [`CaseRecord`]. Nothing escapes: invoker errors and
//! panics become failed records.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::invoker::AgentInvoker;
use crate::models::{CaseRecord, CaseState, TestCase};
use crate::results::ResultPersister;
use crate::utils::Timer;

/// Executes single test cases
pub struct CaseRunner {
    invoker: Arc<dyn AgentInvoker>,
    persister: Arc<ResultPersister>,
    timeout: Duration,
    format_instruction: Option<String>,
}

impl CaseRunner {
    pub fn new(invoker: Arc<dyn AgentInvoker>, persister: Arc<ResultPersister>, timeout: Duration) -> Self {
        Self {
            invoker,
            persister,
            timeout,
            format_instruction: None,
        }
    }

    /// Append `instruction` to every prompt; blank text disables it
    pub fn with_format_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        self.format_instruction = (!instruction.trim().is_empty()).then_some(instruction);
        self
    }

    /// Prompt actually sent to the agent
    pub fn compose_prompt(&self, prompt: &str) -> String {
        match &self.format_instruction {
            Some(instruction) => format!("{prompt}\n\n{instruction}"),
            None => prompt.to_string(),
        }
    }

    /// Run one case to a record; never fails
    pub async fn run_case(&self, case: &TestCase) -> CaseRecord {
        info!(case_id = %case.id, invoker = self.invoker.name(), "Running {}", case);

        let timer = Timer::start(format!("case {}", case.id));
        let prompt = self.compose_prompt(&case.prompt);
        debug!(case_id = %case.id, state = %CaseState::Running, agent_id = %case.agent_id, "Invoking agent");

        let outcome = AssertUnwindSafe(self.invoker.invoke(&case.agent_id, &prompt, self.timeout))
            .catch_unwind()
            .await;

        let start_time = timer.started_at();
        let end_time = timer.now();

        let failure = match outcome {
            Ok(Ok(result)) => {
                if result.is_timeout() {
                    warn!(case_id = %case.id, "Test case {} timed out after {}s", case.id, self.timeout.as_secs());
                }
                let elapsed = timer.stop().as_secs_f64();
                let transcript_path = self.persister.transcript_path(case);
                if let Err(e) = self.persister.write_transcript(case, &result) {
                    error!(case_id = %case.id, "{:#}", e);
                }

                return CaseRecord {
                    id: case.id.clone(),
                    codename: case.codename.clone(),
                    prompt: case.prompt.clone(),
                    success: result.success,
                    elapsed_secs: Some(elapsed),
                    transcript_path: Some(transcript_path.display().to_string()),
                    start_time,
                    end_time,
                    error: None,
                };
            }
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => panic_message(panic.as_ref()),
        };

        error!(case_id = %case.id, "Test case {} failed with exception: {}", case.id, failure);
        CaseRecord {
            id: case.id.clone(),
            codename: case.codename.clone(),
            prompt: case.prompt.clone(),
            success: false,
            elapsed_secs: None,
            transcript_path: None,
            start_time,
            end_time,
            error: Some(failure),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic: unknown payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{FakeInvoker, ERROR_AGENT, PANIC_AGENT};
    use crate::models::CaseState;
    use tempfile::tempdir;

    fn runner(dir: &std::path::Path) -> CaseRunner {
        let persister = Arc::new(ResultPersister::new(dir).unwrap());
        CaseRunner::new(Arc::new(FakeInvoker::default()), persister, Duration::from_secs(5))
    }

    #[test]
    fn test_compose_prompt() {
        let dir = tempdir().unwrap();
        let plain = runner(dir.path());
        assert_eq!(plain.compose_prompt("hello"), "hello");

        let blank = runner(dir.path()).with_format_instruction("   ");
        assert_eq!(blank.compose_prompt("hello"), "hello");

        let with = runner(dir.path()).with_format_instruction("Use bullet points.");
        assert_eq!(with.compose_prompt("hello"), "hello\n\nUse bullet points.");
    }

    #[tokio::test]
    async fn test_success_writes_transcript() {
        let dir = tempdir().unwrap();
        let case = TestCase::new("1", "agent", "calendar", "what is on today");
        let record = runner(dir.path()).run_case(&case).await;

        assert_eq!(record.state(), CaseState::Succeeded);
        assert!(record.elapsed_secs.unwrap() >= 0.0);
        assert!(record.start_time <= record.end_time);
        assert_eq!(record.prompt, "what is on today");

        let path = record.transcript_path.unwrap();
        assert!(path.ends_with("1-calendar-what_is_on_today.txt"));
        assert!(std::path::Path::new(&path).exists());
    }

    #[tokio::test]
    async fn test_transcript_shows_original_prompt() {
        let dir = tempdir().unwrap();
        let case = TestCase::new("2", "agent", "mail", "send it");
        let record = runner(dir.path())
            .with_format_instruction("Reply in JSON.")
            .run_case(&case)
            .await;

        let text = std::fs::read_to_string(record.transcript_path.unwrap()).unwrap();
        assert!(text.contains("Prompt: send it\n"));
        assert!(text.contains("STDOUT:\nsend it\n\nReply in JSON.\n"));
    }

    #[tokio::test]
    async fn test_invoker_error_becomes_failed_record() {
        let dir = tempdir().unwrap();
        let case = TestCase::new("3", ERROR_AGENT, "broken", "p");
        let record = runner(dir.path()).run_case(&case).await;

        assert!(!record.success);
        assert_eq!(record.elapsed_secs, None);
        assert_eq!(record.transcript_path, None);
        assert!(record.error.unwrap().contains("invoker exploded"));
    }

    #[tokio::test]
    async fn test_panic_becomes_failed_record() {
        let dir = tempdir().unwrap();
        let case = TestCase::new("4", PANIC_AGENT, "broken", "p");
        let record = runner(dir.path()).run_case(&case).await;

        assert!(!record.success);
        assert_eq!(record.elapsed_secs, None);
        assert_eq!(record.error.as_deref(), Some("panic: agent panicked"));
    }

    #[tokio::test]
    async fn test_transcript_failure_keeps_record() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let runner = runner(&out);
        std::fs::remove_dir_all(&out).unwrap();

        let record = runner.run_case(&TestCase::new("5", "agent", "c", "p")).await;
        assert!(record.success);
        assert!(record.elapsed_secs.is_some());
    }
}
