//! Shared domain types for Lectern.
//!
//! This crate contains the domain types used across the Lectern workspace:
//! personas, conversation turns, session keys, LLM wire types, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod persona;
pub mod search;
pub mod session;
pub mod turn;
