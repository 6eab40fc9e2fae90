//! Result models for agent test runs
//!
//! Defines the normalized invocation result, the per-case record and the
//! run summary written to `execution_summary.json`.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single test case within a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl CaseState {
    pub fn symbol(&self) -> &'static str {
        match self {
            CaseState::Pending => "○",
            CaseState::Running => "…",
            CaseState::Succeeded => "✓",
            CaseState::Failed => "✗",
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseState::Pending => write!(f, "PENDING"),
            CaseState::Running => write!(f, "RUNNING"),
            CaseState::Succeeded => write!(f, "PASS"),
            CaseState::Failed => write!(f, "FAIL"),
        }
    }
}

/// Normalized outcome of one agent invocation, whichever strategy produced it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
    pub elapsed_secs: f64,
}

impl InvocationResult {
    /// Stderr text used when an invocation exceeds its time limit
    pub const TIMEOUT_MESSAGE: &'static str = "execution timeout";

    pub fn failure(stderr: impl Into<String>, elapsed_secs: f64) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            return_code: -1,
            elapsed_secs,
        }
    }

    pub fn timeout(elapsed_secs: f64) -> Self {
        Self::failure(Self::TIMEOUT_MESSAGE, elapsed_secs)
    }

    pub fn is_timeout(&self) -> bool {
        !self.success && self.stderr == Self::TIMEOUT_MESSAGE
    }
}

/// Record of one executed test case, as reported in the run summary
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub codename: String,
    #[serde(rename = "query")]
    pub prompt: String,
    pub success: bool,
    #[serde(rename = "execution_time")]
    pub elapsed_secs: Option<f64>,
    #[serde(rename = "filename")]
    pub transcript_path: Option<String>,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseRecord {
    pub fn state(&self) -> CaseState {
        if self.success {
            CaseState::Succeeded
        } else {
            CaseState::Failed
        }
    }
}

impl fmt::Display for CaseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        write!(f, "{} ID {} - {} - {}", state.symbol(), self.id, self.codename, state)?;
        if let Some(secs) = self.elapsed_secs {
            write!(f, " ({secs:.2}s)")?;
        }
        if let Some(error) = &self.error {
            write!(f, " - {error}")?;
        }
        Ok(())
    }
}

/// Summary of a complete run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub details: Vec<CaseRecord>,
    #[serde(rename = "total_execution_time")]
    pub total_time: f64,
    #[serde(rename = "average_execution_time")]
    pub avg_time: f64,
    #[serde(rename = "min_execution_time")]
    pub min_time: f64,
    #[serde(rename = "max_execution_time")]
    pub max_time: f64,
}

impl RunSummary {
    /// Zeroed summary for a run with nothing to execute
    pub fn empty() -> Self {
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            details: Vec::new(),
            total_time: 0.0,
            avg_time: 0.0,
            min_time: 0.0,
            max_time: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Success rate as a percentage (0.0 for an empty run)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.successful as f64 / self.total as f64) * 100.0
        }
    }

    pub fn has_timings(&self) -> bool {
        self.details.iter().any(|d| d.elapsed_secs.is_some())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} successful ({:.1}%), {} failed",
            self.successful,
            self.total,
            self.success_rate(),
            self.failed
        )
    }
}
