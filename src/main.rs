//! AIP Test Runner - batch execution of AIP agent test cases
//!
//! Loads test cases from a CSV table, runs each prompt against its agent
//! (through the `aip` command line or the agent streaming API), writes one
//! transcript per case and a JSON summary for the run.
//!
//! ## Features
//!
//! - Sequential or bounded-parallel execution with per-case isolation
//! - Process and streaming invocation strategies
//! - Id filters with ranges (`--ids 1,3,5-8`)
//! - Table, summary and JSON summary output
//!
//! ## Usage
//!
//! ```bash
//! # Run every test case with 5 workers
//! aip-test-runner run
//!
//! # Run selected cases one at a time
//! aip-test-runner run --ids 1,4-6 --sequential
//!
//! # Stream from the agent API instead of the aip binary
//! aip-test-runner run --invoker streaming
//!
//! # List the production test cases
//! aip-test-runner list --prod
//! ```

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod cli;
mod config;
mod executor;
mod invoker;
mod models;
mod output;
mod results;
mod source;
mod utils;

use cli::{Args, ListArgs, RunArgs};
use config::{load_format_instruction, AppConfig, EnvConfig};
use executor::{CaseRunner, ExecutionScheduler, SchedulePolicy};
use output::{Console, OutputFormat, Palette, SummaryFormatter};
use results::ResultPersister;
use source::{IdFilter, SourceError};
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        cli::Command::Run(run_args) => {
            run_tests(run_args, args.verbose).await?;
        }
        cli::Command::List(list_args) => {
            list_test_cases(list_args, args.verbose)?;
        }
    }

    Ok(())
}

/// `--verbose` wins over the configured level
fn log_level(config: &AppConfig, verbose: bool) -> LogLevel {
    if verbose {
        return LogLevel::Debug;
    }
    LogLevel::from_name(&config.log_level).unwrap_or_else(|| {
        eprintln!("Unknown log level '{}', using info", config.log_level);
        LogLevel::Info
    })
}

async fn run_tests(args: RunArgs, verbose: bool) -> Result<()> {
    let mut config = AppConfig::resolve(args.config.as_deref(), &EnvConfig::load())?;
    args.apply_to(&mut config);
    config.validate()?;

    init_logger(log_level(&config, verbose), config.log_file.as_deref())?;

    execute(&config, &args).await
}

/// Load, run and report one batch under an already resolved configuration
async fn execute(config: &AppConfig, args: &RunArgs) -> Result<()> {
    let format = OutputFormat::from_name(&args.format).unwrap_or_else(|| {
        warn!("Unknown output format '{}', using table", args.format);
        OutputFormat::Table
    });
    let colorize = !args.no_color && std::io::stdout().is_terminal();
    let policy = SchedulePolicy::from_settings(config.sequential, config.workers);
    let test_cases = config.test_cases_path(args.prod).to_path_buf();
    let filter = args.ids.as_deref().and_then(IdFilter::parse);

    info!("Starting AIP Test Runner");
    info!("Test cases file: {}", test_cases.display());
    info!("Output directory: {}", config.output_dir.display());
    match &filter {
        Some(filter) if filter.is_empty() => warn!("No valid ids in filter '{}'", args.ids.as_deref().unwrap_or_default()),
        Some(filter) => info!("Running {} specific IDs: {}", filter.len(), filter),
        None => info!("Running all test cases"),
    }
    match policy {
        SchedulePolicy::Sequential => info!("Running in SEQUENTIAL mode"),
        SchedulePolicy::Parallel { workers } => info!("Running in PARALLEL mode with {} workers", workers),
    }
    info!("Invoker: {}, timeout: {}s", config.invoker, config.timeout_secs);

    let outcome = source::load(&test_cases, filter.as_ref());
    if outcome.is_empty() {
        match &outcome.error {
            Some(e) => warn!("Nothing to run: {}", e),
            None => warn!("Nothing to run: no test case matched"),
        }
        error!("No test cases to execute");
        return Ok(());
    }

    let persister = Arc::new(ResultPersister::new(&config.output_dir)?);
    let invoker = invoker::build_invoker(config)?;

    let mut runner = CaseRunner::new(invoker, Arc::clone(&persister), Duration::from_secs(config.timeout_secs));
    if config.format_instructions {
        runner = runner.with_format_instruction(load_format_instruction(&config.format_instruction_path));
    } else {
        info!("Format instructions disabled");
    }

    let scheduler = ExecutionScheduler::new(runner, policy, Console::stdout(colorize));
    let summary = scheduler.run(outcome.cases).await;

    if summary.is_empty() {
        return Ok(());
    }
    info!("Run finished: {}", summary);

    if let Err(e) = persister.write_summary(&summary) {
        error!("Error saving summary: {:#}", e);
    }

    let formatter = SummaryFormatter::new(format).with_palette(Palette::new(colorize));
    println!(
        "{}",
        formatter.format_summary(&summary, persister.output_dir(), config.log_file.as_deref())
    );

    Ok(())
}

fn list_test_cases(args: ListArgs, verbose: bool) -> Result<()> {
    let mut config = AppConfig::resolve(args.config.as_deref(), &EnvConfig::load())?;
    init_logger(log_level(&config, verbose), None)?;

    if let Some(path) = args.test_cases {
        config.test_cases = path;
    }
    let path = config.test_cases_path(args.prod);

    match source::load_all(path) {
        Ok(cases) => {
            println!("Available test case IDs:");
            for case in cases {
                println!(
                    "  ID: {} - {} - {}...",
                    case.id,
                    case.codename,
                    case.prompt_preview(50)
                );
            }
        }
        Err(SourceError::NotFound(_)) => {
            println!("Test cases file '{}' not found", path.display());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
