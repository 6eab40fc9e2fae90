//! Agent invocation
//!
//! One `invoke` capability with two strategies: running the `aip` command
//! line as a child process, or consuming the agent's event stream over HTTP.
//! Both produce the same [`InvocationResult`].

mod client;
mod process;
mod stream;

pub use client::AipClient;
pub use process::ProcessInvoker;
pub use stream::StreamingInvoker;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::InvocationResult;

/// Invocation-layer errors that are converted into failed results
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Failed to start agent command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent stream timed out after {0} seconds")]
    StreamTimeout(u64),

    #[error("Agent API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("AIP_API_URL and AIP_API_KEY must be set")]
    MissingCredentials,
}

/// Runs one prompt against one agent.
///
/// Implementations convert their own failures into a failed
/// [`InvocationResult`]; an `Err` means something unexpected escaped and is
/// handled by the scheduler.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, agent_id: &str, prompt: &str, timeout: Duration) -> Result<InvocationResult>;

    /// Short strategy name for logs
    fn name(&self) -> &'static str;
}

/// Invocation strategy, selected once per run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvokerKind {
    #[default]
    Process,
    Streaming,
}

impl InvokerKind {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "process" | "cli" => Some(InvokerKind::Process),
            "streaming" | "stream" | "sdk" => Some(InvokerKind::Streaming),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InvokerKind::Process => "process",
            InvokerKind::Streaming => "streaming",
        }
    }
}

impl fmt::Display for InvokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the invoker selected by the configuration
pub fn build_invoker(config: &AppConfig) -> Result<Arc<dyn AgentInvoker>> {
    let invoker: Arc<dyn AgentInvoker> = match config.invoker {
        InvokerKind::Process => {
            Arc::new(ProcessInvoker::new(&config.aip_binary).with_leading_args(&config.aip_args))
        }
        InvokerKind::Streaming => {
            let client = AipClient::new(&config.api)?;
            Arc::new(StreamingInvoker::new(client))
        }
    };
    Ok(invoker)
}
