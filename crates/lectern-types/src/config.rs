//! Configuration types for Lectern.
//!
//! `AppConfig` mirrors the `config.toml` file. Every section and field has a
//! default, so an empty file (or no file at all) yields a working setup.
//! Configuration is handed to constructors explicitly; nothing here is global.

use serde::{Deserialize, Serialize};

/// Model used when neither the persona nor the config names one.
pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub search: SearchConfig,
    pub history: HistoryConfig,
    pub database: DatabaseConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    /// Default model name; empty means [`FALLBACK_MODEL`].
    pub model: String,
    /// API key. `LECTERN_MODEL_API_KEY` takes precedence.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: String::new(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: 300,
        }
    }
}

impl ModelConfig {
    /// The configured default model, or [`FALLBACK_MODEL`] when unset.
    pub fn default_model(&self) -> &str {
        if self.model.trim().is_empty() {
            FALLBACK_MODEL
        } else {
            &self.model
        }
    }
}

/// Web search tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Master switch; personas still need `enable_search`.
    pub enabled: bool,
    pub base_url: String,
    /// API key. `LECTERN_SEARCH_API_KEY` takes precedence.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Number of results requested per query.
    pub count: u32,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.bochaai.com/v1".to_string(),
            api_key: None,
            count: 10,
            timeout_secs: 30,
        }
    }
}

/// Where session history lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Session history window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub backend: HistoryBackend,
    /// Maximum retained turns per session.
    pub max_turns: usize,
    /// Lifetime of a session window after its last write.
    pub ttl_secs: u64,
    /// How often the server sweeps expired sessions.
    pub purge_interval_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::Sqlite,
            max_turns: 20,
            ttl_secs: 24 * 60 * 60,
            purge_interval_secs: 60 * 60,
        }
    }
}

/// SQLite location. `None` resolves to `{data_dir}/lectern.db`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}
