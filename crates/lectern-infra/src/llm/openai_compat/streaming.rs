//! SSE stream adapter for OpenAI-compatible chat completions.
//!
//! Opens the request with `reqwest-eventsource` and maps each `data:`
//! chunk to provider-agnostic [`StreamEvent`]s:
//! 1. `Connected` once the server accepts the request
//! 2. `TextDelta` per non-empty `choices[0].delta.content`
//! 3. `MessageDelta` when a `finish_reason` arrives
//! 4. `Usage` if the server reports it
//! 5. `Done` on `[DONE]` or end of body
//!
//! A non-2xx status is reported as a single error item before any event.
//! The event source is never allowed to reconnect.

use futures_util::StreamExt;
use reqwest_eventsource::{Error as EventSourceError, Event, RequestBuilderExt};
use tracing::{debug, warn};

use lectern_core::llm::provider::EventStream;
use lectern_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::error_from_response;
use super::types::ChatChunk;

const DONE_SENTINEL: &str = "[DONE]";

/// Start a streaming request. `request` must already carry auth and body.
pub fn create_stream(request: reqwest::RequestBuilder) -> EventStream {
    Box::pin(async_stream::stream! {
        let mut source = match request.eventsource() {
            Ok(source) => source,
            Err(e) => {
                yield Err(LlmError::Provider { message: format!("cannot open stream: {e}") });
                return;
            }
        };

        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => yield Ok(StreamEvent::Connected),
                Ok(Event::Message(message)) => {
                    let data = message.data.trim();
                    if data == DONE_SENTINEL {
                        break;
                    }
                    match serde_json::from_str::<ChatChunk>(data) {
                        Ok(chunk) => {
                            for event in chunk_events(chunk) {
                                yield Ok(event);
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "skipping undecodable stream chunk");
                        }
                    }
                }
                Err(EventSourceError::StreamEnded) => break,
                Err(EventSourceError::InvalidStatusCode(status, response)) => {
                    debug!(status = %status, "stream rejected by provider");
                    yield Err(error_from_response(response).await);
                    source.close();
                    return;
                }
                Err(e) => {
                    yield Err(LlmError::Stream(e.to_string()));
                    source.close();
                    return;
                }
            }
        }

        source.close();
        yield Ok(StreamEvent::Done);
    })
}

fn chunk_events(chunk: ChatChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    if let Some(choice) = chunk.choices.into_iter().next() {
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::TextDelta { text });
        }
        if let Some(reason) = choice.finish_reason {
            events.push(StreamEvent::MessageDelta {
                stop_reason: StopReason::from_finish_reason(&reason),
            });
        }
    }
    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }));
    }
    events
}
