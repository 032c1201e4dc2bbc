//! Model gateway abstractions for Lectern.
//!
//! - `LlmProvider`: RPITIT trait for concrete gateway implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `InstrumentedStream`: keeps a tracing span open while a reply streams

pub mod box_provider;
pub mod instrumented;
pub mod provider;
