//! OpenAI-compatible provider
//!
//! Talks to any backend exposing `POST {endpoint}/chat/completions`
//! (OpenAI, Azure-style gateways, vLLM, LiteLLM, local proxies). The
//! endpoint is chosen per call by the router, so one provider instance
//! serves every configured base URL.

use super::{EvaluationCall, LLMError, LLMProvider, ModelConfig, NetworkErrorKind};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use tracing::debug;

pub struct OpenAIProvider {
    client: Client,
}

impl OpenAIProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn send_once(
        &self,
        call: &EvaluationCall,
        model: &ModelConfig,
        endpoint: &str,
    ) -> super::Result<String> {
        let url = format!("{}/chat/completions", endpoint.trim_end_matches('/'));

        let request = ChatRequest {
            model: &model.model,
            temperature: model.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: call.system_instruction.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: call.payload.to_string(),
                },
            ],
        };

        debug!(
            "Chat request: model={}, endpoint={}, payload_chars={}",
            model.model,
            endpoint,
            request.messages[1].content.len()
        );

        let mut builder = self
            .client
            .post(&url)
            .timeout(model.timeout)
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(api_key) = &model.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let start = std::time::Instant::now();
        let response = builder.send().await.map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status, text));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to decode response body: {}", e)))?;

        debug!(
            "Chat response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LLMError::ParseError("No message content in response".to_string()))
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn evaluate(
        &self,
        call: &EvaluationCall,
        model: &ModelConfig,
        endpoint: &str,
    ) -> super::Result<String> {
        let mut remaining = model.client_retries;
        loop {
            match self.send_once(call, model, endpoint).await {
                Err(e) if remaining > 0 && e.is_retryable() => {
                    debug!("Provider-level retry after: {}", e);
                    remaining -= 1;
                }
                outcome => return outcome,
            }
        }
    }
}

/// Map a reqwest transport error onto the network taxonomy
fn classify_transport_error(error: reqwest::Error) -> LLMError {
    if error.is_timeout() {
        return LLMError::network(NetworkErrorKind::Timeout, error.to_string());
    }

    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }

    let kind = classify_message(&chain, error.is_connect());
    LLMError::network(kind, chain)
}

fn classify_message(message: &str, is_connect: bool) -> NetworkErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("dns") || lower.contains("resolve") || lower.contains("lookup") {
        NetworkErrorKind::Dns
    } else if lower.contains("refused") {
        NetworkErrorKind::Refused
    } else if lower.contains("timed out") || lower.contains("timeout") {
        NetworkErrorKind::Timeout
    } else if is_connect {
        NetworkErrorKind::Refused
    } else {
        NetworkErrorKind::Other
    }
}

fn map_status(status: StatusCode, body: String) -> LLMError {
    match status.as_u16() {
        401 | 403 => LLMError::AuthenticationFailed(body),
        429 => LLMError::RateLimitExceeded,
        500..=599 => LLMError::ProviderUnavailable(format!("HTTP {}: {}", status, body)),
        _ => LLMError::InvalidRequest(format!("HTTP {}: {}", status, body)),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
