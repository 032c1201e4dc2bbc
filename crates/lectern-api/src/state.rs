//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both the CLI and
//! the REST API. Core services are generic over their ports; AppState pins
//! them to the infra implementations chosen by configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lectern_core::agent::engine::{ConversationEngine, EngineConfig};
use lectern_core::agent::orchestrator::ToolOrchestrator;
use lectern_core::history::memory::InMemoryHistoryStore;
use lectern_core::history::session::SessionHistory;
use lectern_core::history::store::{BoxHistoryStore, HistoryPolicy};
use lectern_core::persona::service::PersonaService;
use lectern_core::tool::ToolRegistry;
use lectern_core::tool::search::InternetSearchTool;
use lectern_infra::config::{
    MODEL_API_KEY_ENV, SEARCH_API_KEY_ENV, load_config, resolve_api_key, resolve_data_dir,
};
use lectern_infra::llm::create_provider;
use lectern_infra::search::bocha::BochaSearchClient;
use lectern_infra::sqlite::history::SqliteHistoryStore;
use lectern_infra::sqlite::persona::SqlitePersonaRepository;
use lectern_infra::sqlite::pool::{DatabasePool, database_url_for};
use lectern_types::config::{AppConfig, HistoryBackend};
use lectern_types::error::HistoryError;

pub type ConcretePersonaService = PersonaService<SqlitePersonaRepository>;

pub type ConcreteEngine = ConversationEngine<BoxHistoryStore>;

/// The history backend behind the engine, kept concrete for expiry sweeps.
#[derive(Clone)]
pub enum HistoryJanitor {
    Sqlite(Arc<SqliteHistoryStore>),
    Memory(Arc<InMemoryHistoryStore>),
}

impl HistoryJanitor {
    /// Remove expired sessions. Returns how many were dropped.
    pub async fn purge(&self) -> Result<u64, HistoryError> {
        match self {
            HistoryJanitor::Sqlite(store) => store.purge_expired().await,
            HistoryJanitor::Memory(store) => Ok(store.purge_expired() as u64),
        }
    }

    /// Sweep every `interval` until `shutdown` fires.
    pub fn spawn(self, interval: Duration, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.purge().await {
                            warn!(error = %e, "history purge failed");
                        }
                    }
                }
            }
        })
    }
}

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub persona_service: Arc<ConcretePersonaService>,
    pub engine: Arc<ConcreteEngine>,
    pub janitor: HistoryJanitor,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Resolve the data dir, load config, and wire services.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;
        let config = load_config(config_path, &data_dir).await;
        Self::build(config, data_dir).await
    }

    /// Wire services from an already-loaded configuration.
    pub async fn build(config: AppConfig, data_dir: PathBuf) -> anyhow::Result<Self> {
        let db_url = config
            .database
            .url
            .clone()
            .unwrap_or_else(|| database_url_for(&data_dir));
        let db_pool = DatabasePool::new(&db_url).await?;

        let persona_service = PersonaService::new(SqlitePersonaRepository::new(db_pool.clone()));

        let policy = HistoryPolicy::from_config(&config.history);
        let (history_store, janitor) = match config.history.backend {
            HistoryBackend::Sqlite => {
                let store = Arc::new(SqliteHistoryStore::new(db_pool.clone(), policy));
                (
                    BoxHistoryStore::new(Arc::clone(&store)),
                    HistoryJanitor::Sqlite(store),
                )
            }
            HistoryBackend::Memory => {
                let store = Arc::new(InMemoryHistoryStore::new(policy));
                (
                    BoxHistoryStore::new(Arc::clone(&store)),
                    HistoryJanitor::Memory(store),
                )
            }
        };

        let model_key = resolve_api_key(MODEL_API_KEY_ENV, config.model.api_key.as_deref());
        if model_key.is_none() {
            warn!("no model API key configured; hosted gateways will reject requests");
        }
        let provider = create_provider(&config.model, model_key)?;

        let mut tools = ToolRegistry::new();
        if config.search.enabled {
            match resolve_api_key(SEARCH_API_KEY_ENV, config.search.api_key.as_deref()) {
                Some(key) => {
                    let client = BochaSearchClient::new(&config.search, key)?;
                    tools.register(InternetSearchTool::new(client));
                }
                None => warn!("search enabled but no search API key configured; tool disabled"),
            }
        }
        info!(
            history = ?config.history.backend,
            tools = ?tools.names(),
            "services wired"
        );

        let engine = ConversationEngine::new(
            SessionHistory::new(Arc::new(history_store)),
            ToolOrchestrator::new(Arc::new(provider), tools),
            EngineConfig::from_model_config(&config.model),
        );

        Ok(Self {
            persona_service: Arc::new(persona_service),
            engine: Arc::new(engine),
            janitor,
            config: Arc::new(config),
            data_dir,
            shutdown: CancellationToken::new(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::history::store::HistoryStore;
    use lectern_types::session::SessionKey;
    use lectern_types::turn::ConversationTurn;

    #[tokio::test]
    async fn test_build_wires_sqlite_history() {
        let (state, _dir) = test_support::test_state("http://127.0.0.1:9/v1").await;
        assert!(matches!(state.janitor, HistoryJanitor::Sqlite(_)));
        let key = SessionKey::parse("x").unwrap();
        assert!(state.engine.history().store().load(&key).await.unwrap().is_empty());
        assert_eq!(state.janitor.purge().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_backend_janitor() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.history.backend = HistoryBackend::Memory;
        config.search.enabled = false;
        config.database.url = Some(format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("test.db").display()
        ));
        let state = AppState::build(config, dir.path().to_path_buf()).await.unwrap();

        let HistoryJanitor::Memory(store) = &state.janitor else {
            panic!("expected memory backend");
        };
        let key = SessionKey::parse("s1").unwrap();
        state
            .engine
            .history()
            .append_turn(&key, &ConversationTurn::user("hi"))
            .await;
        assert_eq!(store.session_count(), 1);
        assert_eq!(state.janitor.purge().await.unwrap(), 0);
    }
}
