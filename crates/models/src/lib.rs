//! Typed views of the finance backend's JSON contract.
//! - Request payloads the probes send (serialize only what the backend documents).
//! - Response views the probes decode; decoding failure is itself a shape violation.
//! - Small invariant helpers (settlement, balance effect) used to compute expectations.

pub mod errors;
pub mod auth;
pub mod liability;
pub mod accounting;
pub mod attachment;
pub mod project_finance;
pub mod roles;

/// Tolerance for comparing monetary amounts returned as JSON floats.
pub const MONEY_EPSILON: f64 = 0.01;

pub fn money_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < MONEY_EPSILON
}
