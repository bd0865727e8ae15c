use crate::error::ProbeError;
use crate::report::{passed, CheckResult};
use crate::session::ApiClient;
use crate::suite::Suite;

pub mod accounting;
pub mod attachments;
pub mod auth;
pub mod finance_reports;
pub mod liabilities;
pub mod pnl;
pub mod project_finance;
pub mod receipts;
pub mod roles;

/// Every suite in execution order.
pub fn all() -> Vec<Box<dyn Suite>> {
    vec![
        Box::new(auth::AuthSuite),
        Box::new(liabilities::LiabilitiesSuite),
        Box::new(pnl::PnlSuite),
        Box::new(accounting::AccountingSuite),
        Box::new(attachments::AttachmentsSuite),
        Box::new(receipts::ReceiptsSuite),
        Box::new(project_finance::ProjectFinanceSuite),
        Box::new(roles::RolesSuite),
        Box::new(finance_reports::FinanceReportsSuite),
    ]
}

pub fn names() -> Vec<&'static str> {
    all().iter().map(|s| s.name()).collect()
}

/// Suites named in `names` (in canonical order); all when empty.
pub fn select(names: &[String]) -> Result<Vec<Box<dyn Suite>>, ProbeError> {
    if names.is_empty() {
        return Ok(all());
    }
    let known = self::names();
    let unknown: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| !known.contains(n))
        .collect();
    if !unknown.is_empty() {
        return Err(ProbeError::Config(format!(
            "unknown suites {unknown:?}; known: {known:?}"
        )));
    }
    Ok(all()
        .into_iter()
        .filter(|s| names.iter().any(|n| n == s.name()))
        .collect())
}

/// Rejects check names, bare or `suite::check`, that no suite in `selected` declares.
pub fn validate_checks(selected: &[Box<dyn Suite>], names: &[String]) -> Result<(), ProbeError> {
    let declares = |name: &str| match name.split_once("::") {
        Some((suite, check)) => selected
            .iter()
            .any(|s| s.name() == suite && s.checks().contains(&check)),
        None => selected.iter().any(|s| s.checks().contains(&name)),
    };
    let unknown: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| !declares(n))
        .collect();
    if !unknown.is_empty() {
        let suites: Vec<&str> = selected.iter().map(|s| s.name()).collect();
        return Err(ProbeError::Config(format!(
            "unknown checks {unknown:?} for suites {suites:?}"
        )));
    }
    Ok(())
}

/// The endpoint must refuse a cookie-less GET with 401.
pub(crate) async fn anonymous_get_rejected(anon: &ApiClient, path: &str) -> CheckResult {
    anon.get(path).await?.expect_status(401)?;
    passed()
}
