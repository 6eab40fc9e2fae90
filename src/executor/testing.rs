//! In-process invoker double for executor tests

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::invoker::AgentInvoker;
use crate::models::InvocationResult;

/// Agent id whose invocation returns `Err`
pub const ERROR_AGENT: &str = "error-agent";
/// Agent id whose invocation panics
pub const PANIC_AGENT: &str = "panic-agent";
/// Agent id whose invocation outlives any test timeout
pub const SLOW_AGENT: &str = "slow-agent";
/// Agent id whose invocation reports a failed run
pub const FAILING_AGENT: &str = "failing-agent";

/// Echoes the prompt as stdout after an optional delay
#[derive(Default)]
pub struct FakeInvoker {
    pub delay: Option<Duration>,
}

#[async_trait]
impl AgentInvoker for FakeInvoker {
    async fn invoke(&self, agent_id: &str, prompt: &str, timeout: Duration) -> Result<InvocationResult> {
        match agent_id {
            ERROR_AGENT => anyhow::bail!("invoker exploded"),
            PANIC_AGENT => panic!("agent panicked"),
            SLOW_AGENT => {
                if tokio::time::timeout(timeout, tokio::time::sleep(Duration::from_secs(60)))
                    .await
                    .is_err()
                {
                    return Ok(InvocationResult::timeout(timeout.as_secs_f64()));
                }
                Ok(InvocationResult::failure("slow agent finished", 60.0))
            }
            FAILING_AGENT => Ok(InvocationResult::failure("agent refused", 0.0)),
            _ => {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(InvocationResult {
                    success: true,
                    stdout: prompt.to_string(),
                    stderr: String::new(),
                    return_code: 0,
                    elapsed_secs: 0.0,
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
