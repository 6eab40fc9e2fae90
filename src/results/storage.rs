//! Result persistence
//!
//! Writes one plain-text transcript per case and one JSON summary per run
//! into the output directory.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{InvocationResult, RunSummary, TestCase};

/// File name of the run summary inside the output directory
pub const SUMMARY_FILE_NAME: &str = "execution_summary.json";

/// Maximum length of each sanitized filename component
const MAX_COMPONENT_LEN: usize = 100;

const SECTION_RULE_WIDTH: usize = 50;

/// Map every character outside `[A-Za-z0-9_-]` to `_` and cap the length.
pub fn sanitize_filename(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_COMPONENT_LEN)
        .collect()
}

/// Transcript file name for a case: `{id}-{codename}-{prompt}.txt`
pub fn transcript_filename(case: &TestCase) -> String {
    format!(
        "{}-{}-{}.txt",
        case.id,
        sanitize_filename(&case.codename),
        sanitize_filename(&case.prompt)
    )
}

/// Render the transcript text for one case
pub fn render_transcript(case: &TestCase, result: &InvocationResult) -> String {
    let rule = "-".repeat(SECTION_RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("Test Case ID: {}\n", case.id));
    out.push_str(&format!("Agent ID: {}\n", case.agent_id));
    out.push_str(&format!("Codename: {}\n", case.codename));
    out.push_str(&format!("Prompt: {}\n", case.prompt));
    out.push_str(&format!("Execution Time: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!(
        "Success: {}\n",
        if result.success { "True" } else { "False" }
    ));
    out.push_str(&format!("Return Code: {}\n", result.return_code));
    out.push_str(&rule);
    out.push('\n');
    out.push_str("STDOUT:\n");
    out.push_str(&result.stdout);
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    out.push_str("STDERR:\n");
    out.push_str(&result.stderr);
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    out
}

/// Writer for transcripts and the run summary
#[derive(Clone, Debug)]
pub struct ResultPersister {
    output_dir: PathBuf,
}

impl ResultPersister {
    /// Create a persister, creating the output directory if needed
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn transcript_path(&self, case: &TestCase) -> PathBuf {
        self.output_dir.join(transcript_filename(case))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE_NAME)
    }

    /// Write the transcript for one case, returning its path
    pub fn write_transcript(&self, case: &TestCase, result: &InvocationResult) -> Result<PathBuf> {
        let path = self.transcript_path(case);
        fs::write(&path, render_transcript(case, result))
            .with_context(|| format!("Error saving result to {}", path.display()))?;

        info!("Result saved to: {}", path.display());
        Ok(path)
    }

    /// Write the run summary as pretty JSON
    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        let path = self.summary_path();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create summary file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, summary).context("Failed to write summary")?;
        writer.flush().context("Failed to flush summary")?;

        info!("Summary saved to: {}", path.display());
        Ok(path)
    }
}
