//! Liability register: listing, filters, summary, creation and settlement.

use async_trait::async_trait;
use models::liability::{expect_settlement, Liability, LiabilityStatus, SettlementExpectation};

use crate::assert::{
    as_array, ensure, ensure_eq_str, ensure_money, number, require_fields,
    require_first_item_fields, string,
};
use crate::endpoints;
use crate::error::ProbeError;
use crate::report::{passed, CheckResult, SuiteReport};
use crate::suite::{ProbeContext, Suite};
use crate::suites::anonymous_get_rejected;

pub struct LiabilitiesSuite;

const CHECKS: &[&str] = &[
    "list",
    "filter_by_status",
    "filter_by_category",
    "summary",
    "create",
    "get_by_id",
    "partial_settlement",
    "full_settlement",
    "over_settlement_rejected",
    "vendors",
    "list_requires_auth",
    "summary_requires_auth",
    "pnl_requires_auth",
];

const LIST_FIELDS: &[&str] = &[
    "liability_id",
    "vendor_name",
    "amount",
    "amount_remaining",
    "status",
];
const SUMMARY_FIELDS: &[&str] = &[
    "total_outstanding",
    "due_this_month",
    "overdue",
    "open_count",
    "overdue_count",
    "top_vendors",
];
const CATEGORY: &str = "raw_material";

#[async_trait]
impl Suite for LiabilitiesSuite {
    fn name(&self) -> &'static str {
        "liabilities"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        report.run("list", list(ctx)).await;
        report.run("filter_by_status", filter(ctx, "status", "open")).await;
        report.run("filter_by_category", filter(ctx, "category", CATEGORY)).await;
        report.run("summary", summary(ctx)).await;
        report.run("create", create(ctx)).await;
        report.run("get_by_id", get_by_id(ctx)).await;
        report.run("partial_settlement", settle(ctx, 25_000.0, 10_000.0)).await;
        report.run("full_settlement", settle(ctx, 5_000.0, 5_000.0)).await;
        report.run("over_settlement_rejected", settle(ctx, 1_000.0, 2_000.0)).await;
        report.run("vendors", vendors(ctx)).await;
        let anon = &ctx.anon;
        report
            .run("list_requires_auth", anonymous_get_rejected(anon, endpoints::LIABILITIES))
            .await;
        report
            .run(
                "summary_requires_auth",
                anonymous_get_rejected(anon, endpoints::LIABILITIES_SUMMARY),
            )
            .await;
        report
            .run("pnl_requires_auth", anonymous_get_rejected(anon, endpoints::PNL_SNAPSHOT))
            .await;
    }
}

async fn list(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::LIABILITIES)
        .await?
        .expect_status(200)?
        .json()?;
    let items = as_array(&body, "liabilities")?;
    require_first_item_fields(items, "liability", LIST_FIELDS)?;
    for item in items {
        string(item, "status")?
            .parse::<LiabilityStatus>()
            .map_err(|e| ProbeError::Shape(format!("listed liability: {e}")))?;
    }
    passed()
}

async fn filter(ctx: &ProbeContext, key: &str, value: &str) -> CheckResult {
    let body = ctx
        .session
        .get_query(endpoints::LIABILITIES, &[(key, value)])
        .await?
        .expect_status(200)?
        .json()?;
    for item in as_array(&body, "liabilities")? {
        let actual = item.get(key).and_then(|v| v.as_str()).unwrap_or_default();
        ensure_eq_str(actual, value, &format!("filtered liability {key}"))?;
    }
    passed()
}

async fn summary(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::LIABILITIES_SUMMARY)
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(&body, "liabilities summary", SUMMARY_FIELDS)?;
    for key in ["total_outstanding", "due_this_month", "overdue"] {
        number(&body, key)?;
    }
    let top = as_array(&body["top_vendors"], "top_vendors")?;
    require_first_item_fields(top, "top vendor", &["vendor", "amount"])?;
    passed()
}

async fn create_liability(ctx: &ProbeContext, amount: f64) -> Result<Liability, ProbeError> {
    let payload = ctx.fixtures.liability(amount, CATEGORY);
    let created: Liability = ctx
        .session
        .post_json(endpoints::LIABILITIES, &payload)
        .await?
        .expect_status(200)?
        .json_as()?;
    ensure_eq_str(&created.vendor_name, &payload.vendor_name, "created vendor_name")?;
    ensure_money(created.amount, amount, "created amount")?;
    ensure(
        created.status == LiabilityStatus::Open,
        format!("new liability status is {}, expected open", created.status),
    )?;
    ensure_money(created.amount_remaining, amount, "new liability amount_remaining")?;
    Ok(created)
}

async fn create(ctx: &ProbeContext) -> CheckResult {
    let created = create_liability(ctx, 50_000.0).await?;
    ensure(!created.liability_id.is_empty(), "liability_id is empty")?;
    passed()
}

async fn get_by_id(ctx: &ProbeContext) -> CheckResult {
    let created = create_liability(ctx, 10_000.0).await?;
    let fetched: Liability = ctx
        .session
        .get(&endpoints::liability(&created.liability_id))
        .await?
        .expect_status(200)?
        .json_as()?;
    ensure_eq_str(&fetched.liability_id, &created.liability_id, "fetched liability_id")?;
    ensure_eq_str(&fetched.vendor_name, &created.vendor_name, "fetched vendor_name")?;
    passed()
}

/// Creates a liability of `amount`, pays `payment`, then checks what the register reports.
async fn settle(ctx: &ProbeContext, amount: f64, payment: f64) -> CheckResult {
    let created = create_liability(ctx, amount).await?;
    let path = endpoints::settle_liability(&created.liability_id);
    let resp = ctx
        .session
        .post_json(&path, &ctx.fixtures.settlement(payment))
        .await?;

    match expect_settlement(amount, 0.0, payment) {
        SettlementExpectation::Rejected => {
            resp.expect_status(400)?;
        }
        SettlementExpectation::Accepted { remaining, status } => {
            let settled: Liability = resp.expect_status(200)?.json_as()?;
            ensure_money(settled.amount_settled, payment, "amount_settled")?;
            ensure_money(settled.amount_remaining, remaining, "amount_remaining")?;
            ensure(
                settled.status == status,
                format!(
                    "status after settling {payment} of {amount} is {}, expected {status}",
                    settled.status
                ),
            )?;
        }
    }
    passed()
}

async fn vendors(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::VENDORS)
        .await?
        .expect_status(200)?
        .json()?;
    as_array(&body, "vendors")?;
    passed()
}
