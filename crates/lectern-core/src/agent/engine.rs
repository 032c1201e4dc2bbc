//! Conversation engine for Lectern.
//!
//! `ConversationEngine` drives one turn: load history, compose the system
//! prompt, schedule the user write, ask the orchestrator for a reply source,
//! and hand back a [`StreamBridge`] over it. The model-facing steps race the
//! caller's cancellation token.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};

use lectern_types::config::{FALLBACK_MODEL, ModelConfig};
use lectern_types::error::ConversationError;
use lectern_types::llm::CompletionRequest;
use lectern_types::persona::{Persona, PersonaId};
use lectern_types::session::SessionKey;
use lectern_types::turn::ConversationTurn;

use crate::history::session::SessionHistory;
use crate::history::store::HistoryStore;
use crate::persona::repository::PersonaRepository;

use super::bridge::StreamBridge;
use super::orchestrator::ToolOrchestrator;
use super::prompt::PromptComposer;

/// Generation settings shared by every turn.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub default_model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: FALLBACK_MODEL.to_string(),
            max_tokens: None,
            temperature: None,
        }
    }
}

impl EngineConfig {
    pub fn from_model_config(config: &ModelConfig) -> Self {
        Self {
            default_model: config.default_model().to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Persona override first, then the configured default.
    pub fn model_for(&self, persona: &Persona) -> String {
        persona
            .config
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str())
            .to_string()
    }
}

pub struct ConversationEngine<H> {
    history: SessionHistory<H>,
    orchestrator: ToolOrchestrator,
    config: EngineConfig,
}

impl<H: HistoryStore + 'static> ConversationEngine<H> {
    pub fn new(history: SessionHistory<H>, orchestrator: ToolOrchestrator, config: EngineConfig) -> Self {
        Self {
            history,
            orchestrator,
            config,
        }
    }

    pub fn history(&self) -> &SessionHistory<H> {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start one conversation turn.
    ///
    /// Fails only for a malformed `session_id`, a model failure before the
    /// first fragment, or cancellation. History problems degrade silently.
    pub async fn converse(
        &self,
        session_id: &str,
        persona: &Persona,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<StreamBridge<H>, ConversationError> {
        let key = SessionKey::parse(session_id)?;
        let span = info_span!(
            "conversation.turn",
            session_key = %key,
            persona_id = %persona.id,
            persona_kind = %persona.kind,
            search = persona.config.enable_search,
        );

        async move {
            let prior = until_cancelled(&cancel, self.history.get_history(&key)).await?;
            let system = PromptComposer::build_system_prompt(persona);

            let user = ConversationTurn::user(user_text);
            let mut messages = Vec::with_capacity(prior.len() + 2);
            messages.push(ConversationTurn::system(system));
            messages.extend(prior);
            messages.push(user.clone());
            debug!(context_turns = messages.len(), "assembled context");

            let user_write = self.history.spawn_append(key.clone(), user);

            let request = CompletionRequest {
                model: self.config.model_for(persona),
                messages,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                tools: Vec::new(),
                stream: true,
            };

            let source = until_cancelled(
                &cancel,
                self.orchestrator.reply(request, persona.config.enable_search),
            )
            .await??;

            Ok(StreamBridge::new(
                source,
                self.history.clone(),
                key,
                Some(user_write),
                cancel,
            ))
        }
        .instrument(span)
        .await
    }

    /// Resolve `persona_id` through `repo`, then [`converse`](Self::converse).
    ///
    /// Without a `session_id` the persona id is the session key, so every
    /// caller talking to the persona shares one history window.
    pub async fn converse_persona<R: PersonaRepository>(
        &self,
        repo: &R,
        persona_id: &PersonaId,
        session_id: Option<&str>,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<StreamBridge<H>, ConversationError> {
        let persona = until_cancelled(&cancel, repo.get_by_id(persona_id))
            .await?
            .map_err(|e| ConversationError::Lookup(e.to_string()))?
            .ok_or(ConversationError::PersonaNotFound)?;

        let key = match session_id {
            Some(raw) => raw.to_string(),
            None => SessionKey::for_persona(&persona.id).to_string(),
        };
        self.converse(&key, &persona, user_text, cancel).await
    }
}

async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, ConversationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ConversationError::Cancelled),
        out = fut => Ok(out),
    }
}
