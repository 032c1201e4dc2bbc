//! Web search backends implementing `SearchCapability`.

pub mod bocha;
