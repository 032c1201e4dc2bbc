//! Conversation engine for Lectern.
//!
//! The agent module turns a persona plus a user utterance into a streamed reply:
//! - `PromptComposer`: builds the system prompt from the persona profile
//! - `ToolOrchestrator`: probe-then-maybe-stream, at most one tool round
//! - `ConversationEngine`: per-turn coordination with history and cancellation
//! - `StreamBridge`: forwards fragments and persists the finished reply once

pub mod bridge;
pub mod engine;
pub mod orchestrator;
pub mod prompt;
