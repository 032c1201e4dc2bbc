//! SQLite session history backend.
//!
//! One row per session in `history_sessions` (expiry in unix millis) and
//! one row per turn in `history_turns`. `append` runs as a single write
//! transaction on the one-connection writer pool, which makes
//! append+trim+expire atomic per key.

use chrono::Utc;
use sqlx::Row;
use tracing::{debug, info};

use lectern_core::history::store::{HistoryPolicy, HistoryStore, decode_turns, encode_turn};
use lectern_types::error::HistoryError;
use lectern_types::session::SessionKey;
use lectern_types::turn::ConversationTurn;

use super::pool::DatabasePool;

pub struct SqliteHistoryStore {
    pool: DatabasePool,
    policy: HistoryPolicy,
}

impl SqliteHistoryStore {
    pub fn new(pool: DatabasePool, policy: HistoryPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn policy(&self) -> &HistoryPolicy {
        &self.policy
    }

    /// Delete every expired session and its turns. Returns the number of
    /// sessions removed.
    pub async fn purge_expired(&self) -> Result<u64, HistoryError> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.pool.writer.begin().await.map_err(storage)?;

        sqlx::query(
            "DELETE FROM history_turns WHERE session_key IN
             (SELECT session_key FROM history_sessions WHERE expires_at <= ?)",
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        let removed = sqlx::query("DELETE FROM history_sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(storage)?
            .rows_affected();

        tx.commit().await.map_err(storage)?;
        if removed > 0 {
            info!(sessions = removed, "purged expired history sessions");
        }
        Ok(removed)
    }
}

fn storage(e: sqlx::Error) -> HistoryError {
    HistoryError::Storage(e.to_string())
}

impl HistoryStore for SqliteHistoryStore {
    async fn load(&self, key: &SessionKey) -> Result<Vec<ConversationTurn>, HistoryError> {
        let now = Utc::now().timestamp_millis();
        let rows = sqlx::query(
            "SELECT t.payload FROM history_turns t
             JOIN history_sessions s ON s.session_key = t.session_key
             WHERE t.session_key = ? AND s.expires_at > ?
             ORDER BY t.id ASC",
        )
        .bind(key.as_str())
        .bind(now)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(storage)?;

        let payloads = rows
            .iter()
            .map(|row| row.try_get::<String, _>("payload"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;

        Ok(decode_turns(key, payloads.iter().map(String::as_str)))
    }

    async fn append(&self, key: &SessionKey, turn: &ConversationTurn) -> Result<(), HistoryError> {
        let payload = encode_turn(turn)?;
        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let ttl_ms = i64::try_from(self.policy.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_ms.saturating_add(ttl_ms);
        let max_turns = i64::try_from(self.policy.max_turns).unwrap_or(i64::MAX);

        let mut tx = self.pool.writer.begin().await.map_err(storage)?;

        // An expired window starts over.
        sqlx::query(
            "DELETE FROM history_turns WHERE session_key = ? AND EXISTS
             (SELECT 1 FROM history_sessions WHERE session_key = ? AND expires_at <= ?)",
        )
        .bind(key.as_str())
        .bind(key.as_str())
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        sqlx::query("INSERT INTO history_turns (session_key, payload, created_at) VALUES (?, ?, ?)")
            .bind(key.as_str())
            .bind(&payload)
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let trimmed = sqlx::query(
            "DELETE FROM history_turns WHERE session_key = ? AND id NOT IN
             (SELECT id FROM history_turns WHERE session_key = ? ORDER BY id DESC LIMIT ?)",
        )
        .bind(key.as_str())
        .bind(key.as_str())
        .bind(max_turns)
        .execute(&mut *tx)
        .await
        .map_err(storage)?
        .rows_affected();

        sqlx::query(
            "INSERT INTO history_sessions (session_key, expires_at) VALUES (?, ?)
             ON CONFLICT(session_key) DO UPDATE SET expires_at = excluded.expires_at",
        )
        .bind(key.as_str())
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        debug!(session_key = %key, role = %turn.role, trimmed, "appended history turn");
        Ok(())
    }
}
