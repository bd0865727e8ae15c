use std::time::Instant;

use anyhow::{Context, Result};
use configs::{LoginFailurePolicy, ProbeConfig};
use tracing::{error, info, warn};

use crate::error::ProbeError;
use crate::fixtures::Fixtures;
use crate::readiness::wait_for_backend;
use crate::report::{CheckFilter, CheckStatus, RunReport, SuiteReport};
use crate::retry::RetryPolicy;
use crate::session::{ApiClient, ApiSession};
use crate::suite::{ProbeContext, Suite};
use crate::suites;

/// Name under which a suite's login outcome is recorded when it fails.
pub const LOGIN_CHECK: &str = "login";

pub struct Runner {
    config: ProbeConfig,
    suites: Vec<Box<dyn Suite>>,
    filter: CheckFilter,
    policy: RetryPolicy,
}

impl Runner {
    /// Selects the suites named in `run.suites`, or all of them.
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        let suites = suites::select(&config.run.suites)?;
        let policy = RetryPolicy::from_config(&config.retry);
        Ok(Self {
            config,
            suites,
            filter: CheckFilter::default(),
            policy,
        })
    }

    /// Overrides the configured suite selection when `names` is non-empty.
    pub fn select_suites(mut self, names: &[String]) -> Result<Self, ProbeError> {
        if !names.is_empty() {
            self.suites = suites::select(names)?;
        }
        Ok(self)
    }

    /// Narrows the run to `names`; each must be declared by a selected suite.
    pub fn with_checks(mut self, names: Vec<String>) -> Result<Self, ProbeError> {
        suites::validate_checks(&self.suites, &names)?;
        self.filter = CheckFilter::new(names);
        Ok(self)
    }

    pub fn suite_names(&self) -> Vec<&'static str> {
        self.suites.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let base_url = &self.config.backend.base_url;
        let mut report = RunReport::new(base_url);

        let anon = ApiClient::anonymous(&self.config).context("building anonymous client")?;
        wait_for_backend(&anon, &self.policy)
            .await
            .with_context(|| format!("backend {base_url} not reachable"))?;

        for suite in &self.suites {
            let name = suite.name();
            let mut suite_report = SuiteReport::new(name, self.filter.clone());
            info!(suite = name, event = "suite_start", "running suite");

            match ApiSession::login(&self.config, &self.policy).await {
                Ok(session) => {
                    let ctx = ProbeContext {
                        session,
                        anon: anon.clone(),
                        fixtures: Fixtures::new(&self.config.fixtures),
                    };
                    suite.run(&ctx, &mut suite_report).await;
                }
                Err(e) => match self.config.auth.on_login_failure {
                    LoginFailurePolicy::Fail => {
                        error!(suite = name, event = "login_failed", error = %e, "suite aborted");
                        let detail = Some(e.to_string());
                        suite_report.record(LOGIN_CHECK, CheckStatus::Failed, detail, 0);
                    }
                    LoginFailurePolicy::Skip => {
                        warn!(suite = name, event = "login_failed", error = %e, "suite skipped");
                        let detail = Some(e.to_string());
                        suite_report.record(LOGIN_CHECK, CheckStatus::Skipped, detail, 0);
                    }
                },
            }

            info!(
                suite = name,
                event = "suite_end",
                passed = suite_report.totals.passed,
                skipped = suite_report.totals.skipped,
                failed = suite_report.totals.failed,
                "suite finished"
            );
            report.push(suite_report);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }
}
