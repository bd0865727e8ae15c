//! P&L snapshot, project profit and the founder dashboard.

use async_trait::async_trait;
use models::liability::{
    PnlPeriod, OPEX_FIELDS, PNL_FIELDS, PROFIT_DIFFERENCE_FACTORS, PROJECT_PROFIT_FIELDS,
};
use serde_json::Value;

use crate::assert::{
    as_array, contains_ci, ensure, ensure_eq_str, ensure_money, number, require_fields, string,
};
use crate::endpoints;
use crate::error::ProbeError;
use crate::fixtures::Fixtures;
use crate::report::{passed, skipped, CheckResult, SuiteReport};
use crate::suite::{ProbeContext, Suite};

pub struct PnlSuite;

const CHECKS: &[&str] = &[
    "snapshot_month",
    "snapshot_quarter",
    "snapshot_custom_range",
    "revenue_breakdown",
    "execution_costs",
    "operating_expenses",
    "cash_vs_accounting_profit",
    "project_profit_not_found",
    "project_profit",
    "founder_dashboard",
    "liabilities_card",
];

#[async_trait]
impl Suite for PnlSuite {
    fn name(&self) -> &'static str {
        "pnl"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        report.run("snapshot_month", snapshot_month(ctx)).await;
        report.run("snapshot_quarter", snapshot_quarter(ctx)).await;
        report.run("snapshot_custom_range", snapshot_custom(ctx)).await;
        report.run("revenue_breakdown", revenue_breakdown(ctx)).await;
        report.run("execution_costs", execution_costs(ctx)).await;
        report.run("operating_expenses", operating_expenses(ctx)).await;
        report.run("cash_vs_accounting_profit", profit_views(ctx)).await;
        report
            .run("project_profit_not_found", project_profit_not_found(ctx))
            .await;
        report.run("project_profit", project_profit(ctx)).await;
        report.run("founder_dashboard", founder_dashboard(ctx)).await;
        report.run("liabilities_card", liabilities_card(ctx)).await;
    }
}

async fn snapshot(ctx: &ProbeContext, period: &PnlPeriod) -> Result<Value, ProbeError> {
    ctx.session
        .get_query(endpoints::PNL_SNAPSHOT, &period.query())
        .await?
        .expect_status(200)?
        .json()
}

async fn snapshot_month(ctx: &ProbeContext) -> CheckResult {
    let body = snapshot(ctx, &PnlPeriod::Month).await?;
    require_fields(&body, "pnl snapshot", PNL_FIELDS)?;
    passed()
}

async fn snapshot_quarter(ctx: &ProbeContext) -> CheckResult {
    let body = snapshot(ctx, &PnlPeriod::Quarter).await?;
    let label = string(&body, "period_label")?;
    ensure(
        contains_ci(label, "quarter") || contains_ci(label, "q"),
        format!("quarter period_label {label:?} mentions neither quarter nor q"),
    )?;
    passed()
}

async fn snapshot_custom(ctx: &ProbeContext) -> CheckResult {
    let start_date = Fixtures::days_ago(90);
    let end_date = Fixtures::today();
    let period = PnlPeriod::Custom {
        start_date: start_date.clone(),
        end_date: end_date.clone(),
    };
    let body = snapshot(ctx, &period).await?;
    ensure_eq_str(string(&body, "start_date")?, &start_date, "custom start_date")?;
    ensure_eq_str(string(&body, "end_date")?, &end_date, "custom end_date")?;
    passed()
}

async fn revenue_breakdown(ctx: &ProbeContext) -> CheckResult {
    let body = snapshot(ctx, &PnlPeriod::Month).await?;
    let revenue = &body["revenue"];
    require_fields(revenue, "revenue", &["from_projects", "other_income", "total"])?;
    let expected = number(revenue, "from_projects")? + number(revenue, "other_income")?;
    ensure_money(number(revenue, "total")?, expected, "revenue.total")?;
    passed()
}

async fn execution_costs(ctx: &ProbeContext) -> CheckResult {
    let body = snapshot(ctx, &PnlPeriod::Month).await?;
    let costs = &body["execution_costs"];
    require_fields(costs, "execution_costs", &["paid", "committed", "total_exposure"])?;
    let expected = number(costs, "paid")? + number(costs, "committed")?;
    ensure_money(
        number(costs, "total_exposure")?,
        expected,
        "execution_costs.total_exposure",
    )?;
    passed()
}

async fn operating_expenses(ctx: &ProbeContext) -> CheckResult {
    let body = snapshot(ctx, &PnlPeriod::Month).await?;
    require_fields(&body["operating_expenses"], "operating_expenses", OPEX_FIELDS)?;
    passed()
}

async fn profit_views(ctx: &ProbeContext) -> CheckResult {
    let body = snapshot(ctx, &PnlPeriod::Month).await?;
    require_fields(
        &body,
        "pnl snapshot",
        &[
            "cash_profit",
            "accounting_profit",
            "profit_difference",
            "difference_factors",
        ],
    )?;
    require_fields(
        &body["difference_factors"],
        "difference_factors",
        PROFIT_DIFFERENCE_FACTORS,
    )?;
    passed()
}

async fn project_profit_not_found(ctx: &ProbeContext) -> CheckResult {
    ctx.session
        .get(&endpoints::project_profit("nonexistent_project_123"))
        .await?
        .expect_status(404)?;
    passed()
}

async fn project_profit(ctx: &ProbeContext) -> CheckResult {
    let resp = ctx.session.get(endpoints::PROJECTS).await?;
    if resp.status_code() != 200 {
        return skipped(format!("projects list returned {}", resp.status_code()));
    }
    let projects = resp.json()?;
    let Some(first) = as_array(&projects, "projects")?.first() else {
        return skipped("no projects available");
    };
    let project_id = string(first, "project_id")?;
    let body = ctx
        .session
        .get(&endpoints::project_profit(project_id))
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(&body, "project profit", PROJECT_PROFIT_FIELDS)?;
    passed()
}

async fn founder_dashboard(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::FOUNDER_DASHBOARD)
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(
        &body,
        "founder dashboard",
        &["health", "total_cash_available", "safe_surplus"],
    )?;
    passed()
}

async fn liabilities_card(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::LIABILITIES_SUMMARY)
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(
        &body,
        "outstanding liabilities card",
        &[
            "total_outstanding",
            "due_this_month",
            "overdue",
            "open_count",
            "top_vendors",
        ],
    )?;
    passed()
}
