//! Bounded, expiring conversation memory.
//!
//! - `HistoryStore`: port trait for backends (append+trim+expire is atomic)
//! - `SessionHistory`: failure-tolerant facade used by the engine
//! - `InMemoryHistoryStore`: process-local backend

pub mod memory;
pub mod session;
pub mod store;
