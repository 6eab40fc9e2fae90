//! Configuration module
//!
//! Handles loading and layering the runner configuration: built-in
//! defaults, then a config file, then environment variables. Command line
//! flags are applied last by the caller.

mod env;
mod file;
mod instructions;

pub use env::EnvConfig;
pub use file::find_config_file;
pub use instructions::load_format_instruction;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::invoker::InvokerKind;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default test case table
    pub test_cases: PathBuf,

    /// Test case table used with `--prod`
    pub prod_test_cases: PathBuf,

    /// Directory for transcripts and the run summary
    pub output_dir: PathBuf,

    /// Number of concurrent workers
    pub workers: usize,

    /// Per-case invocation timeout in seconds
    pub timeout_secs: u64,

    /// Run cases one at a time in file order
    pub sequential: bool,

    /// Invocation strategy
    pub invoker: InvokerKind,

    /// Command used by the process invoker
    pub aip_binary: String,

    /// Arguments placed before `agents run`, e.g. `["run", "aip"]` with `uv`
    pub aip_args: Vec<String>,

    /// File holding the response-format instruction
    pub format_instruction_path: PathBuf,

    /// Append the format instruction to every prompt
    pub format_instructions: bool,

    /// Log file path; `None` disables file logging
    pub log_file: Option<PathBuf>,

    /// Log level name (trace, debug, info, warn, error)
    pub log_level: String,

    /// Agent API access for the streaming invoker
    pub api: ApiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            test_cases: PathBuf::from("data/test_cases.csv"),
            prod_test_cases: PathBuf::from("data/test_cases_prod.csv"),
            output_dir: PathBuf::from("output"),
            workers: 5,
            timeout_secs: 300,
            sequential: false,
            invoker: InvokerKind::Process,
            aip_binary: "aip".to_string(),
            aip_args: Vec::new(),
            format_instruction_path: PathBuf::from("instructions/format_instruction.txt"),
            format_instructions: true,
            log_file: Some(PathBuf::from("test_execution.log")),
            log_level: "info".to_string(),
            api: ApiConfig::default(),
        }
    }
}

/// Agent API credentials
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub bosa_token: Option<String>,
    pub bosa_api_key: Option<String>,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if file::is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        Ok(config)
    }

    /// Defaults, overlaid with the config file (explicit or discovered) and
    /// then the environment
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let mut config = match explicit.map(Path::to_path_buf).or_else(find_config_file) {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load(&path)?
            }
            None => Self::default(),
        };
        if env.has_any() {
            tracing::debug!("Applying environment overrides");
        }
        env.apply_to(&mut config);
        Ok(config)
    }

    /// Reject settings the scheduler cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.workers < 1 {
            anyhow::bail!("Invalid worker count {}: at least 1 worker is required", self.workers);
        }
        if self.timeout_secs < 1 {
            anyhow::bail!("Invalid timeout {}s: must be at least 1 second", self.timeout_secs);
        }
        Ok(())
    }

    /// Test case table for the selected environment
    pub fn test_cases_path(&self, prod: bool) -> &Path {
        if prod {
            &self.prod_test_cases
        } else {
            &self.test_cases
        }
    }
}
