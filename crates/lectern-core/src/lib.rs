//! Conversation engine and repository trait definitions for Lectern.
//!
//! This crate defines the "ports" (repository, history, model, and tool
//! traits) that the infrastructure layer implements, plus the engine that
//! drives one conversation turn. It depends only on `lectern-types` --
//! never on `lectern-infra` or any database/IO crate.

pub mod agent;
pub mod history;
pub mod llm;
pub mod persona;
pub mod tool;

#[cfg(test)]
pub(crate) mod testing;
