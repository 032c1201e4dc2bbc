//! Infrastructure layer for Lectern.
//!
//! Implements the ports defined in `lectern-core`: SQLite persona and
//! history storage, the OpenAI-compatible model gateway, the Bocha search
//! client, and the config file loader.

pub mod config;
pub mod llm;
pub mod search;
pub mod sqlite;
