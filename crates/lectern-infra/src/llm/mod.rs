//! Model gateway implementations.
//!
//! Lectern speaks to one OpenAI-compatible endpoint. [`create_provider`]
//! builds it from [`ModelConfig`] and erases it into a [`BoxLlmProvider`].

pub mod openai_compat;

use std::time::Duration;

use secrecy::SecretString;
use tracing::info;

use lectern_core::llm::box_provider::BoxLlmProvider;
use lectern_types::config::ModelConfig;
use lectern_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;

/// Create the configured gateway.
///
/// `api_key` is the already-resolved secret (environment first, then
/// config). A missing key is allowed: local servers such as Ollama accept
/// unauthenticated requests, and hosted ones answer 401.
pub fn create_provider(
    config: &ModelConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let timeout = Duration::from_secs(config.timeout_secs.max(1));
    let provider = OpenAiCompatibleProvider::new(&config.base_url, api_key, timeout)?;
    info!(
        base_url = %provider.base_url(),
        model = %config.default_model(),
        "model gateway configured"
    );
    Ok(BoxLlmProvider::new(provider))
}
