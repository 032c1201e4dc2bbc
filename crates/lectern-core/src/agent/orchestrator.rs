//! Single-round tool orchestration.
//!
//! Per turn the orchestrator either streams straight from the model, or
//! probes the model with the tool schemas attached and then:
//! - returns the probe's content as a one-fragment reply when no tool was
//!   requested, or
//! - runs the requested tools concurrently, folds their results into the
//!   context, and streams a second, tool-free completion.
//!
//! There is never a second tool round.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::{Stream, StreamExt};
use tracing::{Instrument, debug, info, info_span, warn};

use lectern_types::llm::{CompletionRequest, LlmError, StreamEvent};
use lectern_types::turn::{ConversationTurn, ToolCall};

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::instrumented::InstrumentedStream;
use crate::tool::ToolRegistry;

/// Reply text fragments for one turn, in order.
pub type ReplySource = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

pub struct ToolOrchestrator {
    provider: Arc<BoxLlmProvider>,
    tools: ToolRegistry,
}

impl ToolOrchestrator {
    pub fn new(provider: Arc<BoxLlmProvider>, tools: ToolRegistry) -> Self {
        Self { provider, tools }
    }

    pub fn provider(&self) -> &BoxLlmProvider {
        &self.provider
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Produce the final reply source for `request`.
    ///
    /// `allow_tools` is the persona's search switch. Model failures on the
    /// probe or on opening the stream are returned as errors; tool failures
    /// only shrink the set of results folded back into the context.
    pub async fn reply(
        &self,
        mut request: CompletionRequest,
        allow_tools: bool,
    ) -> Result<ReplySource, LlmError> {
        if !allow_tools || self.tools.is_empty() {
            debug!(allow_tools, "streaming without tools");
            return self.open_stream(request).await;
        }

        let mut probe = request.clone();
        probe.tools = self.tools.definitions();
        probe.stream = false;

        let span = info_span!(
            "gen_ai.probe",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %probe.model,
            gen_ai.request.tools = probe.tools.len(),
        );
        let response = self.provider.complete(&probe).instrument(span).await?;

        if response.tool_calls.is_empty() {
            debug!(chars = response.content.len(), "probe answered directly");
            return Ok(one_shot(response.content));
        }

        info!(
            requested = response.tool_calls.len(),
            tools = ?response.tool_calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "model requested tools"
        );
        let completed = self.run_tools(&response.tool_calls).await;
        if completed.is_empty() {
            warn!("every requested tool failed, answering from the original context");
        } else {
            let (calls, results): (Vec<ToolCall>, Vec<ConversationTurn>) =
                completed.into_iter().unzip();
            request
                .messages
                .push(ConversationTurn::assistant_tool_calls(response.content, calls));
            request.messages.extend(results);
        }

        self.open_stream(request).await
    }

    /// Run every requested call concurrently and wait for all of them.
    ///
    /// Returns the successful calls paired with their result turns, in the
    /// order the model requested them.
    async fn run_tools(&self, calls: &[ToolCall]) -> Vec<(ToolCall, ConversationTurn)> {
        let invocations = calls.iter().map(|call| async move {
            let Some(tool) = self.tools.get(&call.name) else {
                warn!(tool = %call.name, call_id = %call.id, "model requested an unknown tool, omitting");
                return None;
            };
            let span = info_span!("tool.call", tool = %call.name, call_id = %call.id);
            match tool.invoke(&call.arguments).instrument(span).await {
                Ok(text) => Some((call.clone(), ConversationTurn::tool_result(call.id.clone(), text))),
                Err(e) => {
                    warn!(tool = %call.name, call_id = %call.id, error = %e, "tool failed, omitting from this turn");
                    None
                }
            }
        });
        join_all(invocations).await.into_iter().flatten().collect()
    }

    /// Start a tool-free streaming completion.
    ///
    /// Waits until the provider accepts the request so that open failures
    /// (bad key, unknown model) surface here instead of mid-stream.
    async fn open_stream(&self, mut request: CompletionRequest) -> Result<ReplySource, LlmError> {
        request.tools.clear();
        request.stream = true;

        let span = info_span!(
            "gen_ai.stream",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.messages = request.messages.len(),
        );

        let mut events = self.provider.stream(request);
        let first = async {
            while let Some(event) = events.next().await {
                match event? {
                    StreamEvent::Connected => return Ok(None),
                    StreamEvent::TextDelta { text } => return Ok(Some(text)),
                    _ => {}
                }
            }
            Ok::<_, LlmError>(None)
        }
        .instrument(span.clone())
        .await?;

        let rest = events.filter_map(|event| async move {
            match event {
                Ok(StreamEvent::TextDelta { text }) if !text.is_empty() => Some(Ok(text)),
                Ok(StreamEvent::Usage(usage)) => {
                    debug!(
                        gen_ai.usage.input_tokens = usage.input_tokens,
                        gen_ai.usage.output_tokens = usage.output_tokens,
                        "stream usage"
                    );
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        });
        let head = futures_util::stream::iter(first.filter(|t| !t.is_empty()).map(Ok));

        Ok(Box::pin(InstrumentedStream::new(head.chain(rest), span)))
    }
}

/// A reply that is already complete, as a stream of one fragment.
pub fn one_shot(text: String) -> ReplySource {
    Box::pin(futures_util::stream::iter([Ok(text)]))
}
