//! Black-box conformance probes for the finance backend's REST contract.
//!
//! One authenticated session per suite; each check asserts status, response
//! shape and a documented business rule.

pub mod assert;
pub mod endpoints;
pub mod error;
pub mod fixtures;
pub mod observability;
pub mod readiness;
pub mod report;
pub mod retry;
pub mod runner;
pub mod session;
pub mod suite;
pub mod suites;

pub use error::ProbeError;
pub use report::{CheckResult, Outcome, RunReport};
pub use runner::Runner;

/// Runs the configured suites, optionally narrowed to `suites` and `checks`.
pub async fn run(
    config: configs::ProbeConfig,
    suites: &[String],
    checks: Vec<String>,
) -> anyhow::Result<RunReport> {
    let runner = Runner::new(config)?
        .select_suites(suites)?
        .with_checks(checks)?;
    runner.run().await
}
