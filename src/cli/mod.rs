//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::invoker::InvokerKind;

/// AIP agent test runner
#[derive(Parser, Debug)]
#[command(name = "aip-test-runner")]
#[command(version)]
#[command(about = "Run AIP agent test cases and collect their transcripts")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run test cases against their agents
    Run(RunArgs),

    /// List available test cases
    List(ListArgs),
}

/// Arguments for run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Test case CSV file (columns: id, agent_id, codename, prompt)
    #[arg(short, long)]
    pub test_cases: Option<PathBuf>,

    /// Output directory for transcripts and the summary
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Test case ids to run, e.g. "1,3,5-8"
    #[arg(short, long)]
    pub ids: Option<String>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Run test cases one at a time
    #[arg(short, long)]
    pub sequential: bool,

    /// Do not append the format instruction to prompts
    #[arg(long)]
    pub no_format: bool,

    /// Use the production test case file
    #[arg(long)]
    pub prod: bool,

    /// Invocation strategy (process, streaming)
    #[arg(long, value_parser = parse_invoker)]
    pub invoker: Option<InvokerKind>,

    /// Per-case timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Summary format (table, summary, json, json-pretty)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl RunArgs {
    /// Overlay the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(path) = &self.test_cases {
            config.test_cases = path.clone();
        }
        if let Some(dir) = &self.output {
            config.output_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.sequential {
            config.sequential = true;
        }
        if self.no_format {
            config.format_instructions = false;
        }
        if let Some(invoker) = self.invoker {
            config.invoker = invoker;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
    }
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Test case CSV file
    #[arg(short, long)]
    pub test_cases: Option<PathBuf>,

    /// Use the production test case file
    #[arg(long)]
    pub prod: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

fn parse_invoker(s: &str) -> Result<InvokerKind, String> {
    InvokerKind::from_name(s).ok_or_else(|| format!("unknown invoker '{s}' (expected process or streaming)"))
}
