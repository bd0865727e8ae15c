//! Report catalog, cash flow and daily closing views.

use async_trait::async_trait;

use crate::assert::{as_array, boolean, field, require_fields};
use crate::endpoints;
use crate::fixtures::Fixtures;
use crate::report::{passed, CheckResult, SuiteReport};
use crate::suite::{ProbeContext, Suite};
use crate::suites::anonymous_get_rejected;

pub struct FinanceReportsSuite;

const CHECKS: &[&str] = &[
    "reports_available",
    "cash_flow",
    "daily_closing",
    "daily_closing_history",
    "reports_require_auth",
];

#[async_trait]
impl Suite for FinanceReportsSuite {
    fn name(&self) -> &'static str {
        "finance_reports"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        report.run("reports_available", reports_available(ctx)).await;
        report.run("cash_flow", cash_flow(ctx)).await;
        report.run("daily_closing", daily_closing(ctx)).await;
        report.run("daily_closing_history", daily_closing_history(ctx)).await;
        report
            .run(
                "reports_require_auth",
                anonymous_get_rejected(&ctx.anon, endpoints::REPORTS_AVAILABLE),
            )
            .await;
    }
}

async fn reports_available(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::REPORTS_AVAILABLE)
        .await?
        .expect_status(200)?
        .json()?;
    as_array(field(&body, "reports")?, "reports")?;
    passed()
}

async fn cash_flow(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get_query(endpoints::CASH_FLOW_REPORT, &[("period", "3months")])
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(&body, "cash flow report", &["date_from", "date_to"])?;
    passed()
}

async fn daily_closing(ctx: &ProbeContext) -> CheckResult {
    let today = Fixtures::today();
    let body = ctx
        .session
        .get_query(endpoints::DAILY_CLOSING, &[("date", today.as_str())])
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(&body, "daily closing", &["accounts", "totals", "is_closed"])?;
    as_array(&body["accounts"], "daily closing accounts")?;
    boolean(&body, "is_closed")?;
    passed()
}

async fn daily_closing_history(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get_query(endpoints::DAILY_CLOSING_HISTORY, &[("limit", "10")])
        .await?
        .expect_status(200)?
        .json()?;
    as_array(&body, "daily closing history")?;
    passed()
}
