//! HistoryStore trait definition and shared codec helpers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use lectern_types::config::HistoryConfig;
use lectern_types::error::HistoryError;
use lectern_types::session::SessionKey;
use lectern_types::turn::ConversationTurn;

/// Window limits applied by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// Turns retained per session; older turns are evicted first.
    pub max_turns: usize,
    /// Lifetime of a window, refreshed by every append.
    pub ttl: Duration,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            max_turns: 20,
            ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl HistoryPolicy {
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self {
            max_turns: config.max_turns.max(1),
            ttl: Duration::from_secs(config.ttl_secs.max(1)),
        }
    }
}

/// Storage port for session history.
///
/// Implementations live in this crate (`InMemoryHistoryStore`) and in
/// lectern-infra (`SqliteHistoryStore`).
pub trait HistoryStore: Send + Sync {
    /// Full retained window, oldest first. A missing or expired session is
    /// an empty window, not an error.
    fn load(
        &self,
        key: &SessionKey,
    ) -> impl Future<Output = Result<Vec<ConversationTurn>, HistoryError>> + Send;

    /// Append one turn, trim to the newest `max_turns`, and refresh the TTL
    /// as a single atomic step per key.
    fn append(
        &self,
        key: &SessionKey,
        turn: &ConversationTurn,
    ) -> impl Future<Output = Result<(), HistoryError>> + Send;
}

/// Object-safe version of [`HistoryStore`] with boxed futures.
pub trait HistoryStoreDyn: Send + Sync {
    fn load_boxed<'a>(
        &'a self,
        key: &'a SessionKey,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ConversationTurn>, HistoryError>> + Send + 'a>>;

    fn append_boxed<'a>(
        &'a self,
        key: &'a SessionKey,
        turn: &'a ConversationTurn,
    ) -> Pin<Box<dyn Future<Output = Result<(), HistoryError>> + Send + 'a>>;
}

impl<T: HistoryStore> HistoryStoreDyn for T {
    fn load_boxed<'a>(
        &'a self,
        key: &'a SessionKey,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ConversationTurn>, HistoryError>> + Send + 'a>>
    {
        Box::pin(self.load(key))
    }

    fn append_boxed<'a>(
        &'a self,
        key: &'a SessionKey,
        turn: &'a ConversationTurn,
    ) -> Pin<Box<dyn Future<Output = Result<(), HistoryError>> + Send + 'a>> {
        Box::pin(self.append(key, turn))
    }
}

/// Type-erased history backend selected from configuration at startup.
pub struct BoxHistoryStore {
    inner: Box<dyn HistoryStoreDyn + Send + Sync>,
}

impl BoxHistoryStore {
    pub fn new<T: HistoryStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }
}

impl HistoryStore for BoxHistoryStore {
    async fn load(&self, key: &SessionKey) -> Result<Vec<ConversationTurn>, HistoryError> {
        self.inner.load_boxed(key).await
    }

    async fn append(&self, key: &SessionKey, turn: &ConversationTurn) -> Result<(), HistoryError> {
        self.inner.append_boxed(key, turn).await
    }
}

/// Lets one backend be shared between the engine and a maintenance task.
impl<T: HistoryStore> HistoryStore for Arc<T> {
    fn load(
        &self,
        key: &SessionKey,
    ) -> impl Future<Output = Result<Vec<ConversationTurn>, HistoryError>> + Send {
        (**self).load(key)
    }

    fn append(
        &self,
        key: &SessionKey,
        turn: &ConversationTurn,
    ) -> impl Future<Output = Result<(), HistoryError>> + Send {
        (**self).append(key, turn)
    }
}

/// Serialize a turn for storage.
pub fn encode_turn(turn: &ConversationTurn) -> Result<String, HistoryError> {
    serde_json::to_string(turn).map_err(|e| HistoryError::Encoding(e.to_string()))
}

/// Decode stored payloads, skipping (and logging) any that fail to parse.
pub fn decode_turns<'a>(
    key: &SessionKey,
    payloads: impl IntoIterator<Item = &'a str>,
) -> Vec<ConversationTurn> {
    payloads
        .into_iter()
        .filter_map(|raw| match serde_json::from_str::<ConversationTurn>(raw) {
            Ok(turn) => Some(turn),
            Err(e) => {
                warn!(session_key = %key, error = %e, "skipping undecodable history turn");
                None
            }
        })
        .collect()
}
