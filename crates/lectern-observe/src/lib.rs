//! Tracing setup shared by the Lectern binary.

pub mod tracing_setup;
