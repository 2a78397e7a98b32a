//! Configuration management
//!
//! This module handles loading, validation, and management of the RepoJudge
//! configuration. Configuration is stored in TOML format at
//! ~/.repojudge/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Model identifier, ordered endpoint list, timeout, credentials
//! - **pipeline**: Retry policy, batch budgets, failure handling, truncation
//!
//! Every field has a default, so a partial file (or an empty one) parses.
//!
//! # Examples
//!
//! ```no_run
//! use repojudge_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! // Access configuration values
//! println!("Model: {}", config.llm.model);
//! println!("Batch budget: {}", config.effective_budget());
//! # Ok(())
//! # }
//! ```

use crate::llm::router::RetryPolicy;
use crate::llm::ModelConfig;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Model backend settings
    #[serde(default)]
    pub llm: LLMConfig,

    /// Orchestration settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URLs tried in order on failover
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Per-call timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Retries performed inside the provider itself
    #[serde(default)]
    pub client_retries: u32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoints: default_endpoints(),
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
            api_key_env: default_api_key_env(),
            client_retries: 0,
        }
    }
}

/// How failed batches affect the final score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialFailurePolicy {
    /// Leave the final verdict as the model produced it
    #[default]
    Ignore,

    /// Scale the assessment by the share of batches that succeeded
    Penalize,
}

/// Orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Attempts per model call, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between attempts (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause between consecutive batches (milliseconds)
    #[serde(default = "default_batch_cooldown_ms")]
    pub batch_cooldown_ms: u64,

    /// Serialized-size budget per batch (bytes)
    #[serde(default = "default_batch_budget_bytes")]
    pub batch_budget_bytes: usize,

    /// Cap on the file payload of a single request (characters)
    #[serde(default = "default_max_payload_chars")]
    pub max_payload_chars: usize,

    /// Substitute a placeholder verdict when the final batch fails
    #[serde(default)]
    pub permissive: bool,

    #[serde(default)]
    pub partial_failure_policy: PartialFailurePolicy,

    #[serde(default)]
    pub truncation: TruncationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            batch_cooldown_ms: default_batch_cooldown_ms(),
            batch_budget_bytes: default_batch_budget_bytes(),
            max_payload_chars: default_max_payload_chars(),
            permissive: false,
            partial_failure_policy: PartialFailurePolicy::default(),
            truncation: TruncationConfig::default(),
        }
    }
}

/// Per-file truncation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Longest content kept per file (characters)
    #[serde(default = "default_max_file_chars")]
    pub max_file_chars: usize,

    /// Share of the kept characters taken from the start of the file
    #[serde(default = "default_head_ratio")]
    pub head_ratio: f64,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_file_chars: default_max_file_chars(),
            head_ratio: default_head_ratio(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_endpoints() -> Vec<String> {
    vec!["https://api.openai.com/v1".to_string()]
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_batch_cooldown_ms() -> u64 {
    1000
}

fn default_batch_budget_bytes() -> usize {
    300_000
}

fn default_max_payload_chars() -> usize {
    100_000
}

fn default_max_file_chars() -> usize {
    20_000
}

fn default_head_ratio() -> f64 {
    0.6
}

impl Config {
    /// Load configuration from the default location (~/.repojudge/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path (supports ~ expansion)
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let path = expand_path(path)?;
        let contents = fs::read_to_string(&path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.repojudge/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".repojudge").join("config.toml"))
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.llm.endpoints.is_empty() {
            return Err(EngineError::Config(
                "llm.endpoints must list at least one endpoint".to_string(),
            ));
        }
        for endpoint in &self.llm.endpoints {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(EngineError::Config(format!(
                    "Invalid endpoint '{}'. Must start with http:// or https://",
                    endpoint
                )));
            }
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.pipeline.max_retries == 0 {
            return Err(EngineError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.pipeline.batch_budget_bytes == 0 {
            return Err(EngineError::Config(
                "batch_budget_bytes must be greater than 0".to_string(),
            ));
        }
        if self.pipeline.max_payload_chars == 0 {
            return Err(EngineError::Config(
                "max_payload_chars must be greater than 0".to_string(),
            ));
        }

        let truncation = &self.pipeline.truncation;
        if truncation.max_file_chars == 0 {
            return Err(EngineError::Config(
                "truncation.max_file_chars must be greater than 0".to_string(),
            ));
        }
        if !(truncation.head_ratio > 0.0 && truncation.head_ratio < 1.0) {
            return Err(EngineError::Config(
                "truncation.head_ratio must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        Ok(())
    }

    /// Partition budget: the batch budget, capped by the per-request payload cap
    pub fn effective_budget(&self) -> usize {
        self.pipeline
            .batch_budget_bytes
            .min(self.pipeline.max_payload_chars)
    }

    /// Model settings, with the API key read from the configured variable
    pub fn model_config(&self) -> ModelConfig {
        let api_key = std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        ModelConfig {
            model: self.llm.model.clone(),
            endpoints: self.llm.endpoints.clone(),
            timeout: Duration::from_secs(self.llm.timeout_secs),
            temperature: self.llm.temperature,
            client_retries: self.llm.client_retries,
            api_key,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.pipeline.max_retries,
            delay: Duration::from_millis(self.pipeline.retry_delay_ms),
        }
    }

    pub fn batch_cooldown(&self) -> Duration {
        Duration::from_millis(self.pipeline.batch_cooldown_ms)
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
