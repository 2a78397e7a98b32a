//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from disk,
//! validated, and turned into the settings the pipeline runs with.

use repojudge_engine::conductor::PipelineSettings;
use repojudge_engine::config::{Config, PartialFailurePolicy};
use sdk::errors::EngineError;
use std::time::Duration;

#[test]
fn test_full_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[core]
log_level = "debug"

[llm]
model = "gpt-4o"
endpoints = ["https://primary.example.com/v1", "https://backup.example.com/v1"]
timeout_secs = 120
temperature = 0.0
api_key_env = "REPOJUDGE_TEST_KEY_UNSET"

[pipeline]
max_retries = 4
retry_delay_ms = 500
batch_cooldown_ms = 0
batch_budget_bytes = 50000
max_payload_chars = 40000
permissive = true
partial_failure_policy = "penalize"

[pipeline.truncation]
enabled = true
max_file_chars = 8000
head_ratio = 0.5
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.endpoints.len(), 2);
    assert_eq!(config.effective_budget(), 40000);

    let model = config.model_config();
    assert_eq!(model.model, "gpt-4o");
    assert_eq!(model.timeout, Duration::from_secs(120));
    assert!(model.api_key.is_none());

    let policy = config.retry_policy();
    assert_eq!(policy.max_attempts, 4);
    assert_eq!(policy.delay, Duration::from_millis(500));

    let settings = PipelineSettings::from_config(&config);
    assert_eq!(settings.budget, 40000);
    assert!(settings.permissive);
    assert_eq!(settings.partial_failure_policy, PartialFailurePolicy::Penalize);
    assert!(settings.batch_cooldown.is_zero());

    let truncation = settings.truncation.unwrap();
    assert_eq!(truncation.max_chars, 8000);
    assert_eq!(truncation.head_ratio, 0.5);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config = Config::from_toml_str(
        r#"
[llm]
endpoints = ["http://localhost:8000/v1"]
"#,
    )
    .unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.pipeline.max_retries, 3);
    assert!(!config.pipeline.permissive);
    assert_eq!(
        config.pipeline.partial_failure_policy,
        PartialFailurePolicy::Ignore
    );
    assert!(PipelineSettings::from_config(&config).truncation.is_none());
}

#[test]
fn test_invalid_values_are_rejected() {
    let cases = [
        "[core]\nlog_level = \"loud\"",
        "[llm]\nendpoints = []",
        "[llm]\nendpoints = [\"ftp://example.com\"]",
        "[pipeline]\nmax_retries = 0",
        "[pipeline]\nbatch_budget_bytes = 0",
        "[pipeline.truncation]\nhead_ratio = 1.5",
        "[pipeline]\npartial_failure_policy = \"sometimes\"",
    ];

    for case in cases {
        let result = Config::from_toml_str(case);
        assert!(
            matches!(result, Err(EngineError::Config(_))),
            "expected config error for: {}",
            case
        );
    }
}

#[test]
fn test_missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load_from_path(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[test]
fn test_api_key_is_read_from_named_variable() {
    let var = "REPOJUDGE_TEST_API_KEY";
    std::env::set_var(var, "sk-from-env");

    let mut config = Config::default();
    config.llm.api_key_env = var.to_string();
    assert_eq!(config.model_config().api_key.as_deref(), Some("sk-from-env"));

    std::env::set_var(var, "  ");
    assert!(config.model_config().api_key.is_none());

    std::env::remove_var(var);
}
