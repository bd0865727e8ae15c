use std::fmt::Write as _;
use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ProbeError;
use crate::observability::CHECKS_TOTAL;

/// Result of a check that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Skipped(String),
}

pub type CheckResult = Result<Outcome, ProbeError>;

pub fn passed() -> CheckResult {
    Ok(Outcome::Passed)
}

pub fn skipped(reason: impl Into<String>) -> CheckResult {
    Ok(Outcome::Skipped(reason.into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Skipped,
    Failed,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Totals {
    fn add(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Passed => self.passed += 1,
            CheckStatus::Skipped => self.skipped += 1,
            CheckStatus::Failed => self.failed += 1,
        }
    }

    fn merge(&mut self, other: Totals) {
        self.passed += other.passed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.passed + self.skipped + self.failed
    }
}

/// Check-name filter; empty selects every check.
#[derive(Debug, Clone, Default)]
pub struct CheckFilter {
    names: Vec<String>,
}

impl CheckFilter {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Matches `check` or `suite::check`.
    pub fn selects(&self, suite: &str, check: &str) -> bool {
        self.names.is_empty()
            || self.names.iter().any(|n| {
                n == check || n.split_once("::").is_some_and(|(s, c)| s == suite && c == check)
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub checks: Vec<CheckReport>,
    pub totals: Totals,
    #[serde(skip)]
    filter: CheckFilter,
}

impl SuiteReport {
    pub fn new(suite: &str, filter: CheckFilter) -> Self {
        Self {
            suite: suite.to_string(),
            checks: Vec::new(),
            totals: Totals::default(),
            filter,
        }
    }

    /// Runs one check unless filtered out; a filtered check's future is dropped unpolled.
    pub async fn run<F>(&mut self, name: &str, check: F)
    where
        F: Future<Output = CheckResult>,
    {
        if !self.filter.selects(&self.suite, name) {
            return;
        }
        let started = Instant::now();
        let result = check.await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let (status, detail) = match result {
            Ok(Outcome::Passed) => (CheckStatus::Passed, None),
            Ok(Outcome::Skipped(reason)) => (CheckStatus::Skipped, Some(reason)),
            Err(e) => (CheckStatus::Failed, Some(e.to_string())),
        };
        self.record(name, status, detail, duration_ms);
    }

    pub fn record(
        &mut self,
        name: &str,
        status: CheckStatus,
        detail: Option<String>,
        duration_ms: u64,
    ) {
        CHECKS_TOTAL
            .with_label_values(&[&self.suite, status.as_str()])
            .inc();
        match status {
            CheckStatus::Failed => warn!(
                event = "check",
                suite = %self.suite,
                check = name,
                status = status.as_str(),
                duration_ms,
                detail = detail.as_deref().unwrap_or(""),
                "check failed"
            ),
            _ => info!(
                event = "check",
                suite = %self.suite,
                check = name,
                status = status.as_str(),
                duration_ms,
                detail = detail.as_deref().unwrap_or(""),
                "check finished"
            ),
        }
        self.totals.add(status);
        self.checks.push(CheckReport {
            name: name.to_string(),
            status,
            detail,
            duration_ms,
        });
    }

    pub fn check(&self, name: &str) -> Option<&CheckReport> {
        self.checks.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub suites: Vec<SuiteReport>,
    pub totals: Totals,
}

impl RunReport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            started_at: Utc::now(),
            duration_ms: 0,
            suites: Vec::new(),
            totals: Totals::default(),
        }
    }

    pub fn push(&mut self, suite: SuiteReport) {
        self.totals.merge(suite.totals);
        self.suites.push(suite);
    }

    pub fn suite(&self, name: &str) -> Option<&SuiteReport> {
        self.suites.iter().find(|s| s.suite == name)
    }

    pub fn is_success(&self) -> bool {
        self.totals.failed == 0
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        for suite in &self.suites {
            let _ = writeln!(
                out,
                "{:<18} passed {:>3}  skipped {:>3}  failed {:>3}",
                suite.suite, suite.totals.passed, suite.totals.skipped, suite.totals.failed
            );
            for check in suite.checks.iter().filter(|c| c.status != CheckStatus::Passed) {
                let _ = writeln!(
                    out,
                    "  [{}] {}: {}",
                    check.status.as_str(),
                    check.name,
                    check.detail.as_deref().unwrap_or("")
                );
            }
        }
        let _ = write!(
            out,
            "total {}: {} passed, {} skipped, {} failed in {} ms",
            self.totals.total(),
            self.totals.passed,
            self.totals.skipped,
            self.totals.failed,
            self.duration_ms
        );
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
