//! SSE streaming chat endpoint.
//!
//! POST /api/v1/personas/chat
//!
//! Failures before the first fragment (unknown persona, bad input, model
//! rejected the request) are ordinary JSON error responses. Once the stream
//! is open:
//! - `message`: one reply fragment, raw text
//! - `error`: `{ "message": "..." }`, then the stream closes
//! - `done`: `{}` after a clean finish
//!
//! Dropping the response (client disconnect) cancels the turn's token, and
//! the reply is then never persisted.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use lectern_types::error::ConversationError;
use lectern_types::persona::PersonaId;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub persona_id: String,
    pub message: String,
    /// Explicit history window; defaults to one window per persona.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// POST /api/v1/personas/chat
pub async fn stream_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }
    let persona_id: PersonaId = body
        .persona_id
        .parse()
        .map_err(|_| AppError::Conversation(ConversationError::PersonaNotFound))?;

    let cancel = state.shutdown.child_token();
    let bridge = state
        .engine
        .converse_persona(
            state.persona_service.repo(),
            &persona_id,
            body.session_id.as_deref(),
            &body.message,
            cancel.clone(),
        )
        .await?;
    info!(persona_id = %persona_id, session_key = %bridge.session_key(), "chat stream opened");

    let guard = cancel.drop_guard();
    let events = async_stream::stream! {
        let _guard = guard;
        let mut replies = Box::pin(bridge.into_stream());
        while let Some(item) = replies.next().await {
            match item {
                Ok(fragment) => {
                    yield Ok::<_, Infallible>(Event::default().event("message").data(fragment));
                }
                Err(e) => {
                    warn!(error = %e, "chat stream failed");
                    let data = serde_json::json!({ "message": e.to_string() });
                    yield Ok(Event::default().event("error").data(data.to_string()));
                    return;
                }
            }
        }
        yield Ok(Event::default().event("done").data("{}"));
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
