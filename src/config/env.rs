//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::path::PathBuf;

use super::AppConfig;
use crate::invoker::InvokerKind;

/// Prefix of the runner's own variables
const ENV_PREFIX: &str = "AIP_RUNNER";

/// Configuration read from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// API URL from AIP_API_URL
    pub api_url: Option<String>,
    /// API key from AIP_API_KEY
    pub api_key: Option<String>,
    /// BOSA user token from BOSA_USER_TOKEN
    pub bosa_token: Option<String>,
    /// BOSA API key from BOSA_API_KEY
    pub bosa_api_key: Option<String>,
    /// Workers from AIP_RUNNER_WORKERS
    pub workers: Option<usize>,
    /// Timeout from AIP_RUNNER_TIMEOUT
    pub timeout: Option<u64>,
    /// Output directory from AIP_RUNNER_OUTPUT
    pub output_dir: Option<PathBuf>,
    /// Invoker from AIP_RUNNER_INVOKER
    pub invoker: Option<InvokerKind>,
    /// Sequential from AIP_RUNNER_SEQUENTIAL
    pub sequential: Option<bool>,
    /// Log level from AIP_RUNNER_LOG_LEVEL
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from the process environment
    pub fn load() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let prefixed = |name: &str| get(&format!("{ENV_PREFIX}_{name}"));

        Self {
            api_url: get("AIP_API_URL"),
            api_key: get("AIP_API_KEY"),
            bosa_token: get("BOSA_USER_TOKEN"),
            bosa_api_key: get("BOSA_API_KEY"),
            workers: prefixed("WORKERS").and_then(|v| v.trim().parse().ok()),
            timeout: prefixed("TIMEOUT").and_then(|v| v.trim().parse().ok()),
            output_dir: prefixed("OUTPUT").map(PathBuf::from),
            invoker: prefixed("INVOKER").and_then(|v| InvokerKind::from_name(v.trim())),
            sequential: prefixed("SEQUENTIAL").map(|v| parse_bool(&v)),
            log_level: prefixed("LOG_LEVEL").map(|v| v.trim().to_string()),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.api_url.is_some()
            || self.api_key.is_some()
            || self.bosa_token.is_some()
            || self.bosa_api_key.is_some()
            || self.workers.is_some()
            || self.timeout.is_some()
            || self.output_dir.is_some()
            || self.invoker.is_some()
            || self.sequential.is_some()
            || self.log_level.is_some()
    }

    /// Overlay every variable that is set onto `config`
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(url) = &self.api_url {
            config.api.url = Some(url.clone());
        }
        if let Some(key) = &self.api_key {
            config.api.api_key = Some(key.clone());
        }
        if let Some(token) = &self.bosa_token {
            config.api.bosa_token = Some(token.clone());
        }
        if let Some(key) = &self.bosa_api_key {
            config.api.bosa_api_key = Some(key.clone());
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(invoker) = self.invoker {
            config.invoker = invoker;
        }
        if let Some(sequential) = self.sequential {
            config.sequential = sequential;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}
