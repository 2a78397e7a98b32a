//! LLM Router
//!
//! Drives one logical model call through the retry and failover policy:
//! up to `max_attempts` attempts, a fixed delay between attempts, and a
//! switch to the next configured endpoint before every retry while untried
//! endpoints remain.
//!
//! The router itself is stateless and can be shared between runs. Which
//! endpoint is current lives in an `EndpointSelector` owned by the caller,
//! so concurrent runs never move each other's endpoint.

use super::{EvaluationCall, LLMError, LLMProvider, ModelConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry settings applied to every model call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    pub max_attempts: u32,

    /// Wait between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Per-run cursor over the configured endpoints
///
/// Starts at the first endpoint, moves forward one step per failover and
/// stays on the last endpoint once every endpoint has been tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSelector {
    endpoints: Vec<String>,
    current: usize,
}

impl EndpointSelector {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            current: 0,
        }
    }

    /// Index of the endpoint in use
    pub fn index(&self) -> usize {
        self.current
    }

    /// Base URL of the endpoint in use
    pub fn current(&self) -> Option<&str> {
        self.endpoints.get(self.current).map(String::as_str)
    }

    /// Whether endpoints remain that have not been tried yet
    pub fn has_untried(&self) -> bool {
        self.current + 1 < self.endpoints.len()
    }

    /// Move to the next endpoint if one remains. Returns true on a switch.
    pub fn advance(&mut self) -> bool {
        if self.has_untried() {
            self.current += 1;
            true
        } else {
            false
        }
    }
}

/// State of one attempt, discarded once the call resolves
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    /// 1-based attempt number
    pub attempt_number: u32,
    pub endpoint_index: usize,
    pub last_error: Option<LLMError>,
}

/// Calls a provider under the retry and failover policy
pub struct LLMRouter {
    /// Model backend
    provider: Arc<dyn LLMProvider>,

    /// Model settings passed with every call
    model: ModelConfig,

    /// Retry settings
    policy: RetryPolicy,
}

impl LLMRouter {
    /// Create a new LLM router
    ///
    /// # Arguments
    /// * `provider` - The model backend
    /// * `model` - Model settings, including the ordered endpoint list
    /// * `policy` - Retry settings
    pub fn new(provider: Arc<dyn LLMProvider>, model: ModelConfig, policy: RetryPolicy) -> Self {
        Self {
            provider,
            model,
            policy,
        }
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// A fresh endpoint selector for a new run
    pub fn selector(&self) -> EndpointSelector {
        EndpointSelector::new(self.model.endpoints.clone())
    }

    /// Call the provider with retry and endpoint failover
    ///
    /// This method:
    /// 1. Calls the selector's current endpoint
    /// 2. On failure, waits `policy.delay`, advances the selector if endpoints
    ///    remain, and tries again
    /// 3. Stops early on errors that another attempt cannot fix
    /// 4. Returns the last error once `policy.max_attempts` attempts failed
    pub async fn call(
        &self,
        selector: &mut EndpointSelector,
        call: &EvaluationCall,
    ) -> super::Result<String> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = RetryAttempt {
            attempt_number: 0,
            endpoint_index: selector.index(),
            last_error: None,
        };

        while attempt.attempt_number < max_attempts {
            if attempt.attempt_number > 0 {
                if selector.advance() {
                    info!(
                        "Failing over to endpoint {} of {}",
                        selector.index() + 1,
                        self.model.endpoints.len()
                    );
                }
                if !self.policy.delay.is_zero() {
                    tokio::time::sleep(self.policy.delay).await;
                }
            }

            attempt.attempt_number += 1;
            attempt.endpoint_index = selector.index();

            let endpoint = selector.current().ok_or(LLMError::NoEndpoints)?;
            debug!(
                "Calling {} (attempt {}/{}, endpoint {})",
                self.provider.name(),
                attempt.attempt_number,
                max_attempts,
                attempt.endpoint_index
            );

            match self.provider.evaluate(call, &self.model, endpoint).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(
                        "Attempt {}/{} on endpoint {} failed: {}",
                        attempt.attempt_number, max_attempts, attempt.endpoint_index, e
                    );
                    let retryable = e.is_retryable();
                    attempt.last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(attempt.last_error.unwrap_or(LLMError::NoEndpoints))
    }
}
