//! Error types and handling
//!
//! This module provides the error types returned by the evaluation pipeline.
//! All errors implement the `JudgeErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Partial batch failures and unparseable model output are not errors at this
//! level: they are recorded in the run result. Only outcomes that leave the
//! caller without a verdict surface here.

use thiserror::Error;

/// Trait for error extensions
///
/// Provides a user-safe hint and recoverability information for every
/// engine error.
pub trait JudgeErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint never includes API keys, endpoint credentials or file content.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors may succeed when the same run is attempted again.
    /// Non-recoverable errors need a configuration change first.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, JudgeErrorExt};
///
/// let error = EngineError::FatalPipelineFailure {
///     batch_index: 3,
///     total_batches: 3,
///     cause: "request timed out".to_string(),
/// };
/// assert!(error.is_recoverable());
///
/// let config_error = EngineError::Config("no endpoints".to_string());
/// assert!(!config_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Request errors
    #[error("Invalid evaluation request: {0}")]
    InvalidRequest(String),

    // Pipeline errors
    #[error("Batch {batch_index}/{total_batches} failed after exhausting retries: {cause}")]
    FatalPipelineFailure {
        batch_index: usize,
        total_batches: usize,
        cause: String,
    },

    #[error("None of the {total_batches} batches produced a result")]
    NoBatchSucceeded { total_batches: usize },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JudgeErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::InvalidRequest(_) => "The evaluation request is incomplete. Provide at least one file",
            Self::FatalPipelineFailure { .. } => {
                "The model backend did not answer. Check the endpoints and your network, then retry"
            }
            Self::NoBatchSucceeded { .. } => {
                "No part of the repository could be evaluated. Check the model backend and retry"
            }
            Self::Serialization(_) => "Failed to encode or decode evaluation data",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_failure_message_names_batch() {
        let error = EngineError::FatalPipelineFailure {
            batch_index: 2,
            total_batches: 4,
            cause: "connection refused".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("2/4"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_hints_are_non_empty() {
        let errors = vec![
            EngineError::Config("x".to_string()),
            EngineError::InvalidRequest("x".to_string()),
            EngineError::NoBatchSucceeded { total_batches: 2 },
            EngineError::Serialization("x".to_string()),
            EngineError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")),
        ];
        for error in errors {
            assert!(!error.user_hint().is_empty());
        }
    }

    #[test]
    fn test_only_config_errors_are_unrecoverable() {
        assert!(!EngineError::Config("bad".to_string()).is_recoverable());
        assert!(EngineError::NoBatchSucceeded { total_batches: 1 }.is_recoverable());
        assert!(EngineError::InvalidRequest("empty".to_string()).is_recoverable());
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: EngineError = parse_error.into();
        assert!(matches!(error, EngineError::Serialization(_)));
    }
}
