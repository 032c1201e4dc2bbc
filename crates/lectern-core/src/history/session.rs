//! Failure-tolerant facade over a [`HistoryStore`].
//!
//! Losing memory of a turn is acceptable; losing the user-facing reply is
//! not. Reads therefore degrade to an empty window and writes are logged
//! and dropped instead of surfacing errors.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use lectern_types::session::SessionKey;
use lectern_types::turn::ConversationTurn;

use super::store::HistoryStore;

/// Session history as seen by the conversation engine.
pub struct SessionHistory<H> {
    store: Arc<H>,
}

impl<H> Clone for SessionHistory<H> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<H: HistoryStore + 'static> SessionHistory<H> {
    pub fn new(store: Arc<H>) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<H> {
        &self.store
    }

    /// Retained window for `key`, oldest first. Empty on any failure.
    pub async fn get_history(&self, key: &SessionKey) -> Vec<ConversationTurn> {
        match self.store.load(key).await {
            Ok(turns) => {
                debug!(session_key = %key, turns = turns.len(), "loaded session history");
                turns
            }
            Err(e) => {
                warn!(
                    session_key = %key,
                    error = %e,
                    "history read failed, continuing with empty history"
                );
                Vec::new()
            }
        }
    }

    /// Append a turn and wait for the write. Failures are logged only.
    pub async fn append_turn(&self, key: &SessionKey, turn: &ConversationTurn) {
        if let Err(e) = self.store.append(key, turn).await {
            error!(
                session_key = %key,
                role = %turn.role,
                error = %e,
                "history append failed, turn not remembered"
            );
        }
    }

    /// Append a turn on a detached task.
    ///
    /// The returned handle may be dropped; the write still runs.
    pub fn spawn_append(&self, key: SessionKey, turn: ConversationTurn) -> JoinHandle<()> {
        let history = self.clone();
        tokio::spawn(async move { history.append_turn(&key, &turn).await })
    }

    /// Like [`spawn_append`](Self::spawn_append), but the write starts only
    /// after `after` has finished. Keeps a turn's user write ahead of its
    /// assistant write.
    pub fn spawn_append_after(
        &self,
        after: Option<JoinHandle<()>>,
        key: SessionKey,
        turn: ConversationTurn,
    ) -> JoinHandle<()> {
        let history = self.clone();
        tokio::spawn(async move {
            if let Some(previous) = after {
                let _ = previous.await;
            }
            history.append_turn(&key, &turn).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::memory::InMemoryHistoryStore;
    use crate::testing::FailingHistoryStore;

    fn key() -> SessionKey {
        SessionKey::parse("persona-1").unwrap()
    }

    #[tokio::test]
    async fn test_read_failure_degrades_to_empty() {
        let history = SessionHistory::new(Arc::new(FailingHistoryStore::default()));
        assert!(history.get_history(&key()).await.is_empty());
    }

    #[tokio::test]
    async fn test_append_failure_is_swallowed() {
        let store = Arc::new(FailingHistoryStore::default());
        let history = SessionHistory::new(Arc::clone(&store));
        history.append_turn(&key(), &ConversationTurn::user("hi")).await;
        history
            .spawn_append(key(), ConversationTurn::user("again"))
            .await
            .unwrap();
        assert_eq!(store.append_attempts(), 2);
    }

    #[tokio::test]
    async fn test_spawned_append_lands() {
        let history = SessionHistory::new(Arc::new(InMemoryHistoryStore::default()));
        history
            .spawn_append(key(), ConversationTurn::user("hello"))
            .await
            .unwrap();
        let turns = history.get_history(&key()).await;
        assert_eq!(turns, vec![ConversationTurn::user("hello")]);
    }

    #[tokio::test]
    async fn test_append_after_preserves_order() {
        let history = SessionHistory::new(Arc::new(InMemoryHistoryStore::default()));
        let first = history.spawn_append(key(), ConversationTurn::user("question"));
        history
            .spawn_append_after(Some(first), key(), ConversationTurn::assistant("answer"))
            .await
            .unwrap();

        let turns = history.get_history(&key()).await;
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["question", "answer"]);
    }
}
