//! Process-based invocation
//!
//! Runs `aip agents run <agent> --input <prompt> --verbose` and captures its
//! output streams and exit code.

use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{AgentInvoker, InvokeError};
use crate::models::InvocationResult;
use crate::utils::Timer;

/// Invoker that shells out to the `aip` command line
#[derive(Clone, Debug)]
pub struct ProcessInvoker {
    program: String,
    leading_args: Vec<String>,
}

impl ProcessInvoker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed before `agents run ...`, for wrapper launchers
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn command(&self, agent_id: &str, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(["agents", "run", agent_id, "--input", prompt, "--verbose"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl AgentInvoker for ProcessInvoker {
    async fn invoke(&self, agent_id: &str, prompt: &str, timeout: Duration) -> Result<InvocationResult> {
        let timer = Timer::start(format!("agent {agent_id}"));
        info!(agent_id, program = %self.program, "Executing agent command");

        let child = match self.command(agent_id, prompt).spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = InvokeError::Spawn {
                    program: self.program.clone(),
                    source: e,
                };
                error!(agent_id, "Error executing agent: {}", err);
                return Ok(InvocationResult::failure(err.to_string(), timer.elapsed_secs()));
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let return_code = output.status.code().unwrap_or(-1);
                debug!(agent_id, return_code, "Agent command finished");
                Ok(InvocationResult {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    return_code,
                    elapsed_secs: timer.elapsed_secs(),
                })
            }
            Ok(Err(e)) => {
                error!(agent_id, "Error waiting for agent command: {}", e);
                Ok(InvocationResult::failure(e.to_string(), timer.elapsed_secs()))
            }
            Err(_) => {
                error!(agent_id, timeout_secs = timeout.as_secs(), "Timeout executing agent");
                Ok(InvocationResult::timeout(timer.elapsed_secs()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
