//! Configuration loading: YAML file, then environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use action_executor::ExecutorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::orchestrator::OrchestratorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the healing service the client half talks to.
    pub service_url: String,
    /// Listen address for `postpilot serve`.
    pub bind_addr: String,
    /// Filesystem store root; in-memory when unset.
    pub storage_path: Option<PathBuf>,
    /// Completion endpoint for the generative proposer; fallback-table only
    /// when unset.
    pub llm_endpoint: Option<String>,
    pub llm_model: String,

    pub resolve_timeout_ms: u64,
    pub soft_resolve_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub enable_timeout_ms: u64,
    pub completion_timeout_ms: u64,
    pub completion_poll_ms: u64,
    pub preview_timeout_ms: u64,

    /// Region captured for heal/validate snapshots.
    pub snapshot_region: String,
    /// Snapshot character budget. Tunable: too small and the subtree
    /// holding a failed element gets cut off, hurting heal success.
    pub snapshot_budget: usize,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:8787".to_string(),
            bind_addr: "127.0.0.1:8787".to_string(),
            storage_path: None,
            llm_endpoint: None,
            llm_model: "llama-2-7b-chat".to_string(),
            resolve_timeout_ms: 5_000,
            soft_resolve_timeout_ms: 1_000,
            poll_interval_ms: 100,
            enable_timeout_ms: 5_000,
            completion_timeout_ms: 10_000,
            completion_poll_ms: 200,
            preview_timeout_ms: 10_000,
            snapshot_region: heal_client::DEFAULT_SNAPSHOT_REGION.to_string(),
            snapshot_budget: heal_client::DEFAULT_SNAPSHOT_BUDGET,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            resolve_timeout: Duration::from_millis(self.resolve_timeout_ms),
            soft_resolve_timeout: Duration::from_millis(self.soft_resolve_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            enable_timeout: Duration::from_millis(self.enable_timeout_ms),
            completion_timeout: Duration::from_millis(self.completion_timeout_ms),
            completion_poll: Duration::from_millis(self.completion_poll_ms),
            preview_timeout: Duration::from_millis(self.preview_timeout_ms),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            snapshot_region: self.snapshot_region.clone(),
            snapshot_budget: self.snapshot_budget,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("POSTPILOT_SERVICE_URL") {
            self.service_url = url;
        }
        if let Ok(addr) = std::env::var("POSTPILOT_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("POSTPILOT_STORAGE_PATH") {
            self.storage_path = Some(PathBuf::from(path));
        }
        if let Ok(endpoint) = std::env::var("POSTPILOT_LLM_ENDPOINT") {
            self.llm_endpoint = Some(endpoint);
        }
        if let Ok(budget) = std::env::var("POSTPILOT_SNAPSHOT_BUDGET") {
            match budget.parse() {
                Ok(budget) => self.snapshot_budget = budget,
                Err(_) => warn!("ignoring non-numeric POSTPILOT_SNAPSHOT_BUDGET"),
            }
        }
        if let Ok(level) = std::env::var("POSTPILOT_LOG_LEVEL") {
            self.log_level = level;
        }
    }
}

/// Load configuration from the given path, or the default location, or fall
/// back to defaults when no file exists. Environment variables win last.
pub fn load_config(config_path: Option<&PathBuf>) -> Result<Config, ConfigError> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push("postpilot");
            path.push("config.yaml");
            path
        }
    };

    let mut config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Config::default()
    };

    config.apply_env_overrides();
    Ok(config)
}
