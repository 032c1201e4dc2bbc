//! Test doubles shared by the unit tests in this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use lectern_types::error::{HistoryError, RepositoryError, ToolError};
use lectern_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason,
    StreamEvent, Usage,
};
use lectern_types::persona::{Persona, PersonaId, PersonaKind};
use lectern_types::search::SearchHit;
use lectern_types::session::SessionKey;
use lectern_types::turn::{ConversationTurn, ToolCall};

use crate::history::store::HistoryStore;
use crate::llm::provider::{EventStream, LlmProvider};
use crate::persona::repository::PersonaRepository;
use crate::tool::search::SearchCapability;

/// A persona with only a name and a kind set.
pub fn persona(name: &str, kind: PersonaKind) -> Persona {
    let now = Utc::now();
    Persona {
        id: PersonaId::new(),
        name: name.to_string(),
        kind,
        description: String::new(),
        config: Default::default(),
        profile: Default::default(),
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// History backend that is always down.
#[derive(Default)]
pub struct FailingHistoryStore {
    appends: AtomicUsize,
}

impl FailingHistoryStore {
    pub fn append_attempts(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

impl HistoryStore for FailingHistoryStore {
    async fn load(&self, _key: &SessionKey) -> Result<Vec<ConversationTurn>, HistoryError> {
        Err(HistoryError::Storage("connection refused".to_string()))
    }

    async fn append(&self, _key: &SessionKey, _turn: &ConversationTurn) -> Result<(), HistoryError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        Err(HistoryError::Storage("connection refused".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Model gateway
// ---------------------------------------------------------------------------

/// Requests seen by a [`ScriptedProvider`], shared with the test body.
#[derive(Clone, Default)]
pub struct ProviderLog {
    completions: Arc<Mutex<Vec<CompletionRequest>>>,
    streams: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ProviderLog {
    pub fn completions(&self) -> Vec<CompletionRequest> {
        self.completions.lock().unwrap().clone()
    }

    pub fn streams(&self) -> Vec<CompletionRequest> {
        self.streams.lock().unwrap().clone()
    }
}

/// Provider that replays a fixed probe response and a fixed fragment script.
pub struct ScriptedProvider {
    capabilities: ProviderCapabilities,
    probe: Result<CompletionResponse, LlmError>,
    fragments: Vec<Result<String, LlmError>>,
    open_error: Option<LlmError>,
    stall_probe: bool,
    log: ProviderLog,
}

impl ScriptedProvider {
    /// Streams `fragments`; the probe answers with their concatenation.
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            capabilities: ProviderCapabilities {
                streaming: true,
                tool_calling: true,
                max_context_tokens: 16_384,
                max_output_tokens: 4_096,
            },
            probe: Ok(response(&fragments.concat(), Vec::new())),
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            open_error: None,
            stall_probe: false,
            log: ProviderLog::default(),
        }
    }

    /// Probe answers with a single tool call.
    pub fn with_tool_call(mut self, name: &str, arguments: &str) -> Self {
        self.probe = Ok(response(
            "",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
        ));
        self
    }

    pub fn with_probe(mut self, probe: Result<CompletionResponse, LlmError>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the stream script, errors included.
    pub fn with_script(mut self, fragments: Vec<Result<String, LlmError>>) -> Self {
        self.fragments = fragments;
        self
    }

    /// Fail the stream before it is accepted.
    pub fn with_open_error(mut self, error: LlmError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Make the probe call hang forever.
    pub fn with_stalled_probe(mut self) -> Self {
        self.stall_probe = true;
        self
    }

    pub fn log(&self) -> ProviderLog {
        self.log.clone()
    }
}

pub fn response(content: &str, tool_calls: Vec<ToolCall>) -> CompletionResponse {
    let stop_reason = if tool_calls.is_empty() {
        StopReason::EndTurn
    } else {
        StopReason::ToolUse
    };
    CompletionResponse {
        id: "resp_1".to_string(),
        content: content.to_string(),
        model: "scripted".to_string(),
        tool_calls,
        stop_reason,
        usage: Usage::default(),
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.log.completions.lock().unwrap().push(request.clone());
        if self.stall_probe {
            std::future::pending::<()>().await;
        }
        self.probe.clone()
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        self.log.streams.lock().unwrap().push(request);
        let open_error = self.open_error.clone();
        let fragments = self.fragments.clone();
        Box::pin(async_stream::stream! {
            if let Some(e) = open_error {
                yield Err(e);
                return;
            }
            yield Ok(StreamEvent::Connected);
            for fragment in fragments {
                match fragment {
                    Ok(text) => yield Ok(StreamEvent::TextDelta { text }),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            yield Ok(StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn });
            yield Ok(StreamEvent::Done);
        })
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Search capability that records every query it receives.
#[derive(Default)]
pub struct RecordingSearch {
    hits: Vec<SearchHit>,
    fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

impl SearchCapability for RecordingSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ToolError> {
        self.calls.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(ToolError::Request("search backend unreachable".to_string()));
        }
        Ok(self.hits.clone())
    }
}

// ---------------------------------------------------------------------------
// Persona catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryPersonaRepository {
    personas: Mutex<Vec<Persona>>,
}

impl InMemoryPersonaRepository {
    pub fn with(personas: Vec<Persona>) -> Self {
        Self {
            personas: Mutex::new(personas),
        }
    }
}

impl PersonaRepository for InMemoryPersonaRepository {
    async fn create(&self, persona: &Persona) -> Result<Persona, RepositoryError> {
        let mut personas = self.personas.lock().unwrap();
        if personas.iter().any(|p| p.id == persona.id) {
            return Err(RepositoryError::Conflict(persona.id.to_string()));
        }
        personas.push(persona.clone());
        Ok(persona.clone())
    }

    async fn get_by_id(&self, id: &PersonaId) -> Result<Option<Persona>, RepositoryError> {
        let personas = self.personas.lock().unwrap();
        Ok(personas.iter().find(|p| &p.id == id).cloned())
    }

    async fn list(&self, kind: Option<PersonaKind>) -> Result<Vec<Persona>, RepositoryError> {
        let personas = self.personas.lock().unwrap();
        Ok(personas
            .iter()
            .filter(|p| kind.is_none_or(|k| p.kind == k))
            .cloned()
            .collect())
    }

    async fn update(&self, persona: &Persona) -> Result<Persona, RepositoryError> {
        let mut personas = self.personas.lock().unwrap();
        let slot = personas
            .iter_mut()
            .find(|p| p.id == persona.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = persona.clone();
        Ok(persona.clone())
    }

    async fn delete(&self, id: &PersonaId) -> Result<(), RepositoryError> {
        let mut personas = self.personas.lock().unwrap();
        let before = personas.len();
        personas.retain(|p| &p.id != id);
        if personas.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
