//! LLM Provider Abstraction Layer
//!
//! This module provides the single capability the pipeline needs from a model
//! backend: send a system instruction plus a JSON payload to one endpoint and
//! get raw text back. The `LLMProvider` trait defines that contract; the
//! router wraps it with retry and endpoint failover, and the extractor turns
//! the returned text into a structured result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod extract;
pub mod openai;
pub mod router;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Classification of transport failures
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkErrorKind {
    /// Host name could not be resolved
    Dns,

    /// The call did not complete within the configured timeout
    Timeout,

    /// The endpoint actively refused the connection
    Refused,

    /// Any other transport failure
    Other,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkErrorKind::Dns => write!(f, "DNS"),
            NetworkErrorKind::Timeout => write!(f, "TIMEOUT"),
            NetworkErrorKind::Refused => write!(f, "REFUSED"),
            NetworkErrorKind::Other => write!(f, "OTHER"),
        }
    }
}

/// Errors that can occur during LLM operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("Network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No endpoints configured")]
    NoEndpoints,
}

impl LLMError {
    /// Shorthand for a transport failure
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    /// Whether another attempt (possibly on another endpoint) may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::Network { .. }
            | LLMError::RateLimitExceeded
            | LLMError::ProviderUnavailable(_)
            | LLMError::ParseError(_) => true,
            LLMError::AuthenticationFailed(_)
            | LLMError::InvalidRequest(_)
            | LLMError::NoEndpoints => false,
        }
    }
}

/// Model settings passed with every call
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model identifier understood by the backend
    pub model: String,

    /// Ordered failover candidates (base URLs)
    pub endpoints: Vec<String>,

    /// Per-call timeout, enforced by the provider
    pub timeout: Duration,

    /// Sampling temperature; 0 for deterministic grading
    pub temperature: f32,

    /// Extra attempts the provider may make on its own.
    /// Zero means the orchestrator owns the retry policy.
    pub client_retries: u32,

    /// Bearer token, if the backend needs one
    pub api_key: Option<String>,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>, endpoints: Vec<String>) -> Self {
        Self {
            model: model.into(),
            endpoints,
            timeout: Duration::from_secs(300),
            temperature: 0.0,
            client_retries: 0,
            api_key: None,
        }
    }
}

/// One request to the model: instruction plus structured payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationCall {
    pub system_instruction: String,
    pub payload: serde_json::Value,
}

impl EvaluationCall {
    pub fn new(system_instruction: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            payload,
        }
    }
}

/// LLM Provider trait that all model backends must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openai")
    fn name(&self) -> &str;

    /// Send one call to the given endpoint and return the raw model text
    ///
    /// # Arguments
    /// * `call` - System instruction and JSON payload
    /// * `model` - Model settings (identifier, timeout, temperature)
    /// * `endpoint` - Base URL chosen by the caller's endpoint selector
    ///
    /// # Returns
    /// * `Ok(String)` - The model's text, unparsed
    /// * `Err(LLMError)` - If the request fails
    async fn evaluate(
        &self,
        call: &EvaluationCall,
        model: &ModelConfig,
        endpoint: &str,
    ) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LLMError::network(NetworkErrorKind::Timeout, "slow").is_retryable());
        assert!(LLMError::network(NetworkErrorKind::Dns, "nxdomain").is_retryable());
        assert!(LLMError::RateLimitExceeded.is_retryable());
        assert!(LLMError::ProviderUnavailable("502".to_string()).is_retryable());

        assert!(!LLMError::AuthenticationFailed("401".to_string()).is_retryable());
        assert!(!LLMError::InvalidRequest("400".to_string()).is_retryable());
        assert!(!LLMError::NoEndpoints.is_retryable());
    }

    #[test]
    fn test_network_error_display() {
        let err = LLMError::network(NetworkErrorKind::Refused, "connect failed");
        assert_eq!(err.to_string(), "Network error (REFUSED): connect failed");
    }

    #[test]
    fn test_model_config_defaults() {
        let config = ModelConfig::new("gpt-4o-mini", vec!["http://a".to_string()]);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.client_retries, 0);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_network_kind_serialization() {
        let json = serde_json::to_string(&NetworkErrorKind::Timeout).unwrap();
        assert_eq!(json, "\"TIMEOUT\"");
    }
}
