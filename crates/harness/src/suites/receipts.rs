//! Payment receipts, their PDF rendering and the company settings printed on them.

use async_trait::async_trait;
use models::project_finance::{
    CompanySettingsUpdate, COMPANY_SETTINGS_FIELDS, RECEIPT_DETAIL_FIELDS, RECEIPT_LIST_FIELDS,
};
use serde_json::Value;
use tracing::warn;

use crate::assert::{
    as_array, ensure, ensure_close, ensure_eq_str, field, number, require_fields, string,
};
use crate::endpoints;
use crate::error::ProbeError;
use crate::report::{passed, skipped, CheckResult, SuiteReport};
use crate::suite::{ProbeContext, Suite};

pub struct ReceiptsSuite;

const CHECKS: &[&str] = &[
    "pdf_is_valid",
    "pdf_uses_company_settings",
    "company_settings_fields",
    "receipts_filtered_by_project",
    "receipt_list_columns",
    "receipt_detail",
    "project_finance_detail_summary",
    "receipts_total_matches_project",
];

/// Minimum size of a rendered receipt PDF.
const MIN_PDF_BYTES: usize = 1000;
/// Receipts and project totals are compared to the rupee.
const RECEIPTS_SUM_TOLERANCE: f64 = 1.0;

#[async_trait]
impl Suite for ReceiptsSuite {
    fn name(&self) -> &'static str {
        "receipts"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        report.run("pdf_is_valid", pdf_is_valid(ctx)).await;
        report.run("pdf_uses_company_settings", pdf_with_settings(ctx)).await;
        report
            .run("company_settings_fields", company_settings_fields(ctx))
            .await;
        report
            .run("receipts_filtered_by_project", filtered_by_project(ctx))
            .await;
        report.run("receipt_list_columns", list_columns(ctx)).await;
        report.run("receipt_detail", receipt_detail(ctx)).await;
        report
            .run("project_finance_detail_summary", project_detail_summary(ctx))
            .await;
        report.run("receipts_total_matches_project", receipts_total(ctx)).await;
    }
}

async fn receipts(ctx: &ProbeContext) -> Result<Vec<Value>, ProbeError> {
    let body = ctx
        .session
        .get(endpoints::RECEIPTS)
        .await?
        .expect_status(200)?
        .json()?;
    Ok(as_array(&body, "receipts")?.clone())
}

async fn first_receipt_id(ctx: &ProbeContext) -> Result<Option<String>, ProbeError> {
    match receipts(ctx).await?.first() {
        Some(r) => Ok(Some(string(r, "receipt_id")?.to_string())),
        None => Ok(None),
    }
}

async fn render_pdf(ctx: &ProbeContext, receipt_id: &str) -> Result<(), ProbeError> {
    let resp = ctx.session.get(&endpoints::receipt_pdf(receipt_id)).await?;
    resp.expect_status(200)?;
    ensure(
        resp.has_content_type("pdf"),
        format!("receipt {receipt_id} PDF served as {:?}", resp.content_type),
    )?;
    ensure(
        resp.body.starts_with(b"%PDF"),
        format!("receipt {receipt_id} PDF lacks %PDF header"),
    )?;
    ensure(
        resp.body.len() > MIN_PDF_BYTES,
        format!("receipt {receipt_id} PDF is only {} bytes", resp.body.len()),
    )?;
    Ok(())
}

async fn pdf_is_valid(ctx: &ProbeContext) -> CheckResult {
    let Some(id) = first_receipt_id(ctx).await? else {
        return skipped("no receipts found");
    };
    render_pdf(ctx, &id).await?;
    passed()
}

async fn company_settings(ctx: &ProbeContext) -> Result<Value, ProbeError> {
    ctx.session
        .get(endpoints::COMPANY_SETTINGS)
        .await?
        .expect_status(200)?
        .json()
}

async fn pdf_with_settings(ctx: &ProbeContext) -> CheckResult {
    let previous = company_settings(ctx).await?;
    let restore = CompanySettingsUpdate {
        company_name: previous
            .get("company_name")
            .and_then(Value::as_str)
            .unwrap_or("Arki Dots")
            .to_string(),
        authorized_signatory: previous
            .get("authorized_signatory")
            .and_then(Value::as_str)
            .unwrap_or("Test Signatory")
            .to_string(),
    };
    let update = CompanySettingsUpdate {
        company_name: ctx.fixtures.prefixed("Company Name"),
        authorized_signatory: ctx.fixtures.prefixed("Authorized Person"),
    };

    let outcome = async {
        ctx.session
            .post_json(endpoints::COMPANY_SETTINGS, &update)
            .await?
            .expect_status(200)?;
        match first_receipt_id(ctx).await? {
            Some(id) => {
                render_pdf(ctx, &id).await?;
                passed()
            }
            None => skipped("no receipts found"),
        }
    }
    .await;

    let restored = ctx
        .session
        .post_json(endpoints::COMPANY_SETTINGS, &restore)
        .await;
    match restored {
        Ok(resp) if resp.status_code() == 200 => {}
        Ok(resp) => warn!(
            event = "settings_restore",
            status = resp.status_code(),
            "company settings not restored"
        ),
        Err(e) => warn!(event = "settings_restore", error = %e, "company settings not restored"),
    }
    outcome
}

async fn company_settings_fields(ctx: &ProbeContext) -> CheckResult {
    let settings = company_settings(ctx).await?;
    require_fields(&settings, "company settings", COMPANY_SETTINGS_FIELDS)?;
    passed()
}

/// First project in the finance list that has received money.
async fn project_with_receipts(ctx: &ProbeContext) -> Result<Option<(String, f64)>, ProbeError> {
    let body = ctx
        .session
        .get(endpoints::PROJECT_FINANCE)
        .await?
        .expect_status(200)?
        .json()?;
    for project in as_array(&body, "project finance list")? {
        let received = project
            .get("total_received")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        if received > 0.0 {
            return Ok(Some((string(project, "project_id")?.to_string(), received)));
        }
    }
    Ok(None)
}

async fn receipts_for(ctx: &ProbeContext, project_id: &str) -> Result<Vec<Value>, ProbeError> {
    let body = ctx
        .session
        .get_query(endpoints::RECEIPTS, &[("project_id", project_id)])
        .await?
        .expect_status(200)?
        .json()?;
    Ok(as_array(&body, "project receipts")?.clone())
}

async fn filtered_by_project(ctx: &ProbeContext) -> CheckResult {
    let Some((project_id, _)) = project_with_receipts(ctx).await? else {
        return skipped("no project with receipts found");
    };
    for receipt in receipts_for(ctx, &project_id).await? {
        ensure_eq_str(string(&receipt, "project_id")?, &project_id, "receipt project_id")?;
    }
    passed()
}

async fn list_columns(ctx: &ProbeContext) -> CheckResult {
    let list = receipts(ctx).await?;
    let Some(first) = list.first() else {
        return skipped("no receipts found");
    };
    require_fields(first, "receipt", RECEIPT_LIST_FIELDS)?;
    passed()
}

async fn receipt_detail(ctx: &ProbeContext) -> CheckResult {
    let Some(id) = first_receipt_id(ctx).await? else {
        return skipped("no receipts found");
    };
    let body = ctx
        .session
        .get(&endpoints::receipt(&id))
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(&body, "receipt detail", RECEIPT_DETAIL_FIELDS)?;
    require_fields(field(&body, "project")?, "receipt project", &["contract_value"])?;
    passed()
}

async fn project_detail_summary(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::PROJECT_FINANCE)
        .await?
        .expect_status(200)?
        .json()?;
    let Some(first) = as_array(&body, "project finance list")?.first() else {
        return skipped("no projects found");
    };
    let project_id = string(first, "project_id")?;
    let detail = ctx
        .session
        .get(&endpoints::project_finance(project_id))
        .await?
        .expect_status(200)?
        .json()?;
    require_fields(
        field(&detail, "summary")?,
        "project finance summary",
        &["total_received"],
    )?;
    passed()
}

async fn receipts_total(ctx: &ProbeContext) -> CheckResult {
    let Some((project_id, total_received)) = project_with_receipts(ctx).await? else {
        return skipped("no project with receipts found");
    };
    let mut sum = 0.0;
    for receipt in receipts_for(ctx, &project_id).await? {
        sum += number(&receipt, "amount")?;
    }
    ensure_close(
        sum,
        total_received,
        RECEIPTS_SUM_TOLERANCE,
        &format!("receipts sum for {project_id}"),
    )?;
    passed()
}
