//! Process-local history backend.
//!
//! Each session window lives in a `DashMap` shard entry. Holding the entry
//! guard for the whole append makes append, trim, and TTL refresh atomic
//! with respect to other writers on the same key. Turns are kept as
//! serialized JSON, the same shape the SQLite backend stores.

use std::collections::VecDeque;

use dashmap::DashMap;
use tokio::time::Instant;

use lectern_types::error::HistoryError;
use lectern_types::session::SessionKey;
use lectern_types::turn::ConversationTurn;

use super::store::{HistoryPolicy, HistoryStore, decode_turns, encode_turn};

struct Window {
    turns: VecDeque<String>,
    expires_at: Instant,
}

/// In-memory [`HistoryStore`]. Contents vanish with the process.
pub struct InMemoryHistoryStore {
    policy: HistoryPolicy,
    windows: DashMap<SessionKey, Window>,
}

impl InMemoryHistoryStore {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            policy,
            windows: DashMap::new(),
        }
    }

    /// Drop every expired window. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.windows.retain(|_, window| {
            let live = window.expires_at > now;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Number of live (possibly expired but not yet purged) windows.
    pub fn session_count(&self) -> usize {
        self.windows.len()
    }

    #[cfg(test)]
    pub(crate) fn push_raw(&self, key: &SessionKey, payload: &str) {
        let now = Instant::now();
        let mut window = self.windows.entry(key.clone()).or_insert_with(|| Window {
            turns: VecDeque::new(),
            expires_at: now + self.policy.ttl,
        });
        window.turns.push_back(payload.to_string());
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new(HistoryPolicy::default())
    }
}

impl HistoryStore for InMemoryHistoryStore {
    async fn load(&self, key: &SessionKey) -> Result<Vec<ConversationTurn>, HistoryError> {
        let now = Instant::now();
        let expired = match self.windows.get(key) {
            None => return Ok(Vec::new()),
            Some(window) if window.expires_at > now => {
                return Ok(decode_turns(key, window.turns.iter().map(String::as_str)));
            }
            Some(_) => true,
        };
        if expired {
            self.windows.remove_if(key, |_, window| window.expires_at <= now);
        }
        Ok(Vec::new())
    }

    async fn append(&self, key: &SessionKey, turn: &ConversationTurn) -> Result<(), HistoryError> {
        let payload = encode_turn(turn)?;
        let now = Instant::now();

        let mut window = self.windows.entry(key.clone()).or_insert_with(|| Window {
            turns: VecDeque::with_capacity(self.policy.max_turns),
            expires_at: now,
        });
        if window.expires_at <= now {
            window.turns.clear();
        }
        window.turns.push_back(payload);
        while window.turns.len() > self.policy.max_turns {
            window.turns.pop_front();
        }
        window.expires_at = now + self.policy.ttl;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_types::turn::TurnRole;
    use std::sync::Arc;
    use std::time::Duration;

    fn key(raw: &str) -> SessionKey {
        SessionKey::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_missing_session_is_empty() {
        let store = InMemoryHistoryStore::default();
        assert!(store.load(&key("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keeps_insertion_order_under_cap() {
        let store = InMemoryHistoryStore::default();
        let k = key("s1");
        for i in 0..20 {
            store
                .append(&k, &ConversationTurn::user(format!("turn {i}")))
                .await
                .unwrap();
        }
        let turns = store.load(&k).await.unwrap();
        assert_eq!(turns.len(), 20);
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.content, format!("turn {i}"));
        }
    }

    #[tokio::test]
    async fn test_evicts_oldest_beyond_cap() {
        let store = InMemoryHistoryStore::default();
        let k = key("s1");
        for i in 0..27 {
            store
                .append(&k, &ConversationTurn::user(format!("turn {i}")))
                .await
                .unwrap();
        }
        let turns = store.load(&k).await.unwrap();
        assert_eq!(turns.len(), 20);
        assert_eq!(turns.first().unwrap().content, "turn 7");
        assert_eq!(turns.last().unwrap().content, "turn 26");
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_role_and_content() {
        let store = InMemoryHistoryStore::default();
        let k = key("s1");
        let turn = ConversationTurn::assistant("Thou art welcome, traveller.\n  -- Will");
        store.append(&k, &turn).await.unwrap();
        let turns = store.load(&k).await.unwrap();
        assert_eq!(turns, vec![turn]);
        assert_eq!(turns[0].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemoryHistoryStore::default();
        store.append(&key("a"), &ConversationTurn::user("for a")).await.unwrap();
        store.append(&key("b"), &ConversationTurn::user("for b")).await.unwrap();
        let a = store.load(&key("a")).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "for a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expires_after_ttl() {
        let store = InMemoryHistoryStore::new(HistoryPolicy {
            max_turns: 20,
            ttl: Duration::from_secs(60),
        });
        let k = key("s1");
        store.append(&k, &ConversationTurn::user("hello")).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(store.load(&k).await.unwrap().len(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.load(&k).await.unwrap().is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_append_refreshes_ttl() {
        let store = InMemoryHistoryStore::new(HistoryPolicy {
            max_turns: 20,
            ttl: Duration::from_secs(60),
        });
        let k = key("s1");
        store.append(&k, &ConversationTurn::user("one")).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        store.append(&k, &ConversationTurn::assistant("two")).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;

        let turns = store.load(&k).await.unwrap();
        assert_eq!(turns.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_append_after_expiry_starts_fresh_window() {
        let store = InMemoryHistoryStore::new(HistoryPolicy {
            max_turns: 20,
            ttl: Duration::from_secs(60),
        });
        let k = key("s1");
        store.append(&k, &ConversationTurn::user("stale")).await.unwrap();
        tokio::time::advance(Duration::from_secs(120)).await;
        store.append(&k, &ConversationTurn::user("fresh")).await.unwrap();

        let turns = store.load(&k).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = InMemoryHistoryStore::new(HistoryPolicy {
            max_turns: 20,
            ttl: Duration::from_secs(60),
        });
        store.append(&key("old"), &ConversationTurn::user("x")).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        store.append(&key("new"), &ConversationTurn::user("y")).await.unwrap();

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_turn_is_skipped() {
        let store = InMemoryHistoryStore::default();
        let k = key("s1");
        store.append(&k, &ConversationTurn::user("before")).await.unwrap();
        store.push_raw(&k, "{\"role\": 42}");
        store.append(&k, &ConversationTurn::assistant("after")).await.unwrap();

        let turns = store.load(&k).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["before", "after"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_never_exceed_cap() {
        let store = Arc::new(InMemoryHistoryStore::default());
        let k = key("shared");
        let mut handles = Vec::new();
        for i in 0..64 {
            let store = Arc::clone(&store);
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(&k, &ConversationTurn::user(format!("m{i}")))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.load(&k).await.unwrap().len(), 20);
    }

    #[test]
    fn test_purge_during_concurrent_appends() {
        let store = Arc::new(InMemoryHistoryStore::new(HistoryPolicy {
            max_turns: 20,
            ttl: Duration::from_secs(3600),
        }));
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                rt.block_on(async {
                    for i in 0..5_000 {
                        store
                            .append(&key(&format!("s{i}")), &ConversationTurn::user("hi"))
                            .await
                            .unwrap();
                    }
                });
            })
        };

        let mut purged = 0;
        while !writer.is_finished() {
            purged += store.purge_expired();
        }
        writer.join().unwrap();

        assert_eq!(purged, 0);
        assert_eq!(store.session_count(), 5_000);
    }
}
