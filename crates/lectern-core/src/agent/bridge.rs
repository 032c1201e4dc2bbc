//! StreamBridge: forwards reply fragments to a transport and persists the
//! assembled assistant turn once the reply completes.

use futures_util::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lectern_types::error::ConversationError;
use lectern_types::session::SessionKey;
use lectern_types::turn::ConversationTurn;

use crate::history::session::SessionHistory;
use crate::history::store::HistoryStore;

use super::orchestrator::ReplySource;

/// Pull-based, single-pass view over one turn's reply.
///
/// Every fragment returned by [`recv`](Self::recv) is also appended to an
/// internal buffer. When the source ends cleanly and the buffer is
/// non-empty, exactly one assistant turn is written to history, after the
/// turn's user write. Errors and cancellation persist nothing.
pub struct StreamBridge<H> {
    source: ReplySource,
    history: SessionHistory<H>,
    key: SessionKey,
    cancel: CancellationToken,
    buffer: String,
    user_write: Option<JoinHandle<()>>,
    assistant_write: Option<JoinHandle<()>>,
    finished: bool,
}

impl<H: HistoryStore + 'static> StreamBridge<H> {
    pub fn new(
        source: ReplySource,
        history: SessionHistory<H>,
        key: SessionKey,
        user_write: Option<JoinHandle<()>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            history,
            key,
            cancel,
            buffer: String::new(),
            user_write,
            assistant_write: None,
            finished: false,
        }
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }

    /// Next fragment, an error, or `None` at end of stream.
    ///
    /// After an error or `None` every further call returns `None`.
    pub async fn recv(&mut self) -> Option<Result<String, ConversationError>> {
        if self.finished {
            return None;
        }

        let polled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = self.source.next() => Some(item),
        };

        match polled {
            None => {
                self.finished = true;
                debug!(session_key = %self.key, "reply cancelled, nothing persisted");
                Some(Err(ConversationError::Cancelled))
            }
            Some(Some(Ok(fragment))) => {
                self.buffer.push_str(&fragment);
                Some(Ok(fragment))
            }
            Some(Some(Err(e))) => {
                self.finished = true;
                warn!(
                    session_key = %self.key,
                    received_chars = self.buffer.len(),
                    error = %e,
                    "reply stream failed, partial reply not persisted"
                );
                Some(Err(ConversationError::Model(e)))
            }
            Some(None) => {
                self.finished = true;
                self.persist();
                None
            }
        }
    }

    fn persist(&mut self) {
        if self.buffer.is_empty() {
            debug!(session_key = %self.key, "empty reply, nothing persisted");
            return;
        }
        let text = std::mem::take(&mut self.buffer);
        debug!(session_key = %self.key, chars = text.len(), "persisting assistant turn");
        self.assistant_write = Some(self.history.spawn_append_after(
            self.user_write.take(),
            self.key.clone(),
            ConversationTurn::assistant(text),
        ));
    }

    /// Wait for this turn's background history writes to finish.
    ///
    /// Never required for correctness; callers that exit right after a
    /// reply (the CLI, tests) use it so the writes are not cut short.
    pub async fn settle(&mut self) {
        for handle in [self.user_write.take(), self.assistant_write.take()]
            .into_iter()
            .flatten()
        {
            let _ = handle.await;
        }
    }

    /// Adapt the bridge into a `Stream` for transports.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<String, ConversationError>> + Send + 'static {
        async_stream::stream! {
            while let Some(item) = self.recv().await {
                yield item;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::history::memory::InMemoryHistoryStore;
    use crate::testing::FailingHistoryStore;
    use lectern_types::llm::LlmError;
    use lectern_types::turn::TurnRole;

    fn source(items: Vec<Result<&str, LlmError>>) -> ReplySource {
        let items: Vec<Result<String, LlmError>> =
            items.into_iter().map(|r| r.map(str::to_string)).collect();
        Box::pin(futures_util::stream::iter(items))
    }

    fn bridge(
        store: &Arc<InMemoryHistoryStore>,
        items: Vec<Result<&str, LlmError>>,
    ) -> StreamBridge<InMemoryHistoryStore> {
        StreamBridge::new(
            source(items),
            SessionHistory::new(Arc::clone(store)),
            SessionKey::parse("persona-1").unwrap(),
            None,
            CancellationToken::new(),
        )
    }

    fn key() -> SessionKey {
        SessionKey::parse("persona-1").unwrap()
    }

    #[tokio::test]
    async fn test_complete_stream_persists_once() {
        let store = Arc::new(InMemoryHistoryStore::default());
        let mut bridge = bridge(&store, vec![Ok("Hel"), Ok("lo")]);

        assert_eq!(bridge.recv().await.unwrap().unwrap(), "Hel");
        assert_eq!(bridge.recv().await.unwrap().unwrap(), "lo");
        assert!(bridge.recv().await.is_none());
        assert!(bridge.recv().await.is_none());
        bridge.settle().await;

        let turns = store.load(&key()).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::Assistant);
        assert_eq!(turns[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_error_after_fragment_persists_nothing() {
        let store = Arc::new(InMemoryHistoryStore::default());
        let mut bridge = bridge(
            &store,
            vec![Ok("Hel"), Err(LlmError::Stream("reset".to_string())), Ok("lo")],
        );

        assert_eq!(bridge.recv().await.unwrap().unwrap(), "Hel");
        assert!(matches!(
            bridge.recv().await,
            Some(Err(ConversationError::Model(LlmError::Stream(_))))
        ));
        assert!(bridge.recv().await.is_none());
        bridge.settle().await;

        assert!(store.load(&key()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_persists_nothing() {
        let store = Arc::new(InMemoryHistoryStore::default());
        let mut bridge = bridge(&store, vec![]);
        assert!(bridge.recv().await.is_none());
        bridge.settle().await;
        assert!(store.load(&key()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_stream_without_persisting() {
        let store = Arc::new(InMemoryHistoryStore::default());
        let cancel = CancellationToken::new();
        let pending: ReplySource = Box::pin(
            futures_util::stream::iter(vec![Ok("Hel".to_string())])
                .chain(futures_util::stream::pending()),
        );
        let mut bridge = StreamBridge::new(
            pending,
            SessionHistory::new(Arc::clone(&store)),
            key(),
            None,
            cancel.clone(),
        );

        assert_eq!(bridge.recv().await.unwrap().unwrap(), "Hel");
        cancel.cancel();
        assert!(matches!(bridge.recv().await, Some(Err(ConversationError::Cancelled))));
        assert!(bridge.recv().await.is_none());
        bridge.settle().await;
        assert!(store.load(&key()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assistant_write_follows_user_write() {
        let store = Arc::new(InMemoryHistoryStore::default());
        let history = SessionHistory::new(Arc::clone(&store));
        let user_write = history.spawn_append(key(), ConversationTurn::user("Hi"));
        let mut bridge = StreamBridge::new(
            source(vec![Ok("Hello")]),
            history,
            key(),
            Some(user_write),
            CancellationToken::new(),
        );
        while bridge.recv().await.is_some() {}
        bridge.settle().await;

        let roles: Vec<TurnRole> = store
            .load(&key())
            .await
            .unwrap()
            .iter()
            .map(|t| t.role)
            .collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::Assistant]);
    }

    #[tokio::test]
    async fn test_into_stream_yields_then_ends() {
        let store = Arc::new(InMemoryHistoryStore::default());
        let items: Vec<_> = bridge(&store, vec![Ok("a"), Ok("b")])
            .into_stream()
            .collect()
            .await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_history_failure_does_not_affect_reply() {
        let store = Arc::new(FailingHistoryStore::default());
        let mut bridge = StreamBridge::new(
            source(vec![Ok("still "), Ok("here")]),
            SessionHistory::new(Arc::clone(&store)),
            key(),
            None,
            CancellationToken::new(),
        );
        let mut text = String::new();
        while let Some(fragment) = bridge.recv().await {
            text.push_str(&fragment.unwrap());
        }
        bridge.settle().await;
        assert_eq!(text, "still here");
        assert_eq!(store.append_attempts(), 1);
    }
}
