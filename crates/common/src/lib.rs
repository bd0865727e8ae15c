//! Shared runtime helpers for the probe binary and harness crates:
//! tracing setup and environment lookups.

pub mod env;
pub mod utils;
