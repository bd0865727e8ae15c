use async_trait::async_trait;

use crate::fixtures::Fixtures;
use crate::report::SuiteReport;
use crate::session::{ApiClient, ApiSession};

/// Everything a suite needs: one authenticated session, one anonymous client, fixtures.
pub struct ProbeContext {
    pub session: ApiSession,
    pub anon: ApiClient,
    pub fixtures: Fixtures,
}

/// A group of checks against one REST resource, sharing one session.
#[async_trait]
pub trait Suite: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check names in execution order, for `--list`.
    fn checks(&self) -> &'static [&'static str];

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport);
}
