//! OpenAI-compatible model gateway.
//!
//! One [`OpenAiCompatibleProvider`] talks to any server exposing
//! `POST {base_url}/chat/completions` (OpenAI, DeepSeek, Moonshot, vLLM,
//! Ollama, ...). Probes are plain JSON calls with function-calling tools;
//! replies stream over SSE.
//!
//! The API key is held as a [`SecretString`] and only exposed when the
//! `Authorization` header is built. The provider does not implement
//! `Debug`.

pub mod streaming;
pub mod types;

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use lectern_core::llm::provider::{EventStream, LlmProvider};
use lectern_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
};
use lectern_types::turn::ToolCall;

use self::streaming::create_stream;
use self::types::{ChatRequest, ChatResponse, ErrorBody};

pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    capabilities: ProviderCapabilities,
}

impl OpenAiCompatibleProvider {
    /// Build a provider for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// `timeout` bounds a whole request, streaming included.
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            capabilities: ProviderCapabilities {
                streaming: true,
                tool_calling: true,
                max_context_tokens: 128_000,
                max_output_tokens: 4_096,
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, body: &ChatRequest) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(body);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }
}

/// Map a non-2xx response to an [`LlmError`].
pub(crate) async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let retry_after_ms = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000));
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);
    map_status(status, message, retry_after_ms)
}

fn map_status(status: StatusCode, message: String, retry_after_ms: Option<u64>) -> LlmError {
    match status.as_u16() {
        401 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited { retry_after_ms },
        400 if is_context_length(&message) => LlmError::ContextLengthExceeded(message),
        400 => LlmError::InvalidRequest(message),
        500..=599 => LlmError::Overloaded(format!("HTTP {status}: {message}")),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

fn is_context_length(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("context_length") || lower.contains("context length")
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatRequest::from_completion(request, false);
        let response = self.post(&body).send().await.map_err(|e| LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let usage = chat.usage.unwrap_or_default();
        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Deserialization("response has no choices".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .into_iter()
            .map(ToolCall::from)
            .collect();
        let stop_reason = match choice.finish_reason.as_deref() {
            Some(reason) => StopReason::from_finish_reason(reason),
            None if !tool_calls.is_empty() => StopReason::ToolUse,
            None => StopReason::EndTurn,
        };
        debug!(
            model = %chat.model,
            tool_calls = tool_calls.len(),
            stop_reason = %stop_reason,
            "completion received"
        );

        Ok(CompletionResponse {
            id: chat.id,
            content: choice.message.content.unwrap_or_default(),
            model: chat.model,
            tool_calls,
            stop_reason,
            usage: Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let body = ChatRequest::from_completion(&request, true);
        create_stream(self.post(&body))
    }
}
