//! Project finance views and vendor mapping maintenance.

use async_trait::async_trait;
use models::project_finance::{
    can_edit_vendor_mapping, VendorMapping, PROJECT_FINANCE_DETAIL_FIELDS,
    PROJECT_FINANCE_LIST_FIELDS, PROJECT_FINANCE_SUMMARY_FIELDS, VENDOR_CATEGORIES,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::assert::{
    as_array, boolean, contains_ci, ensure, ensure_eq_str, ensure_money, field, require_fields,
    require_first_item_fields, string, string_list,
};
use crate::endpoints;
use crate::error::ProbeError;
use crate::report::{passed, skipped, CheckResult, SuiteReport};
use crate::session::ApiResponse;
use crate::suite::{ProbeContext, Suite};

pub struct ProjectFinanceSuite;

const CHECKS: &[&str] = &[
    "vendor_categories",
    "project_list",
    "project_search",
    "project_detail",
    "project_detail_not_found",
    "vendor_mappings_list",
    "create_vendor_mapping",
    "update_vendor_mapping",
    "delete_vendor_mapping",
    "invalid_category_rejected",
    "invalid_project_rejected",
    "update_missing_mapping",
    "delete_missing_mapping",
    "edit_lock_flag",
];

const MAPPING_FIELDS: &[&str] = &["mapping_id", "vendor_name", "category", "planned_amount"];
const MISSING_MAPPING: &str = "invalid_mapping_id";
const MISSING_PROJECT: &str = "invalid_project_id";

/// A mapping created by this run, plus the project it belongs to.
struct CreatedMapping {
    mapping_id: String,
    project_id: String,
}

#[async_trait]
impl Suite for ProjectFinanceSuite {
    fn name(&self) -> &'static str {
        "project_finance"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        let mut created: Option<CreatedMapping> = None;

        report.run("vendor_categories", vendor_categories(ctx)).await;
        report.run("project_list", project_list(ctx)).await;
        report.run("project_search", project_search(ctx)).await;
        report.run("project_detail", project_detail(ctx)).await;
        report.run("project_detail_not_found", project_detail_not_found(ctx)).await;
        report.run("vendor_mappings_list", vendor_mappings_list(ctx)).await;
        report.run("create_vendor_mapping", create_mapping(ctx, &mut created)).await;
        report.run("update_vendor_mapping", update_mapping(ctx, created.as_ref())).await;
        report.run("delete_vendor_mapping", delete_mapping(ctx, created.as_ref())).await;
        report.run("invalid_category_rejected", invalid_category(ctx)).await;
        report.run("invalid_project_rejected", invalid_project(ctx)).await;
        report.run("update_missing_mapping", update_missing(ctx)).await;
        report.run("delete_missing_mapping", delete_missing(ctx)).await;
        report.run("edit_lock_flag", edit_lock_flag(ctx)).await;
    }
}

/// 400s caused by the project's edit lock rather than by the request itself.
fn locked_by_progress(resp: &ApiResponse) -> bool {
    if resp.status_code() != 400 {
        return false;
    }
    let detail = resp.detail();
    contains_ci(&detail, "spending") || contains_ci(&detail, "production")
}

async fn vendor_categories(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::VENDOR_CATEGORIES)
        .await?
        .expect_status(200)?
        .json()?;
    let categories = string_list(&body, "vendor categories")?;
    for expected in VENDOR_CATEGORIES {
        ensure(
            categories.iter().any(|c| c == expected),
            format!("vendor categories {categories:?} lack {expected}"),
        )?;
    }
    passed()
}

async fn project_list(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get(endpoints::PROJECT_FINANCE)
        .await?
        .expect_status(200)?
        .json()?;
    let rows = as_array(&body, "project finance list")?;
    require_first_item_fields(rows, "project finance", PROJECT_FINANCE_LIST_FIELDS)?;
    passed()
}

async fn project_search(ctx: &ProbeContext) -> CheckResult {
    let body = ctx
        .session
        .get_query(endpoints::PROJECT_FINANCE, &[("search", ctx.fixtures.prefix())])
        .await?
        .expect_status(200)?
        .json()?;
    as_array(&body, "project finance search")?;
    passed()
}

async fn project_detail(ctx: &ProbeContext) -> CheckResult {
    let project_id = ctx.fixtures.project_id();
    let resp = ctx.session.get(&endpoints::project_finance(project_id)).await?;
    if resp.status_code() == 404 {
        return skipped(format!("project {project_id} not found"));
    }
    let body = resp.expect_status(200)?.json()?;
    require_fields(&body, "project finance detail", PROJECT_FINANCE_DETAIL_FIELDS)?;
    let detail_id = string(field(&body, "project")?, "project_id")?;
    ensure_eq_str(detail_id, project_id, "detail project_id")?;
    let summary = &body["summary"];
    require_fields(summary, "project finance summary", PROJECT_FINANCE_SUMMARY_FIELDS)?;
    let vendor_mappings = as_array(&body["vendor_mappings"], "vendor_mappings")?;
    require_first_item_fields(vendor_mappings, "vendor mapping", MAPPING_FIELDS)?;
    passed()
}

async fn project_detail_not_found(ctx: &ProbeContext) -> CheckResult {
    ctx.session
        .get(&endpoints::project_finance(MISSING_PROJECT))
        .await?
        .expect_status(404)?;
    passed()
}

async fn mappings(
    ctx: &ProbeContext,
    project_id: &str,
) -> Result<Option<Vec<Value>>, ProbeError> {
    let resp = ctx.session.get(&endpoints::vendor_mapping(project_id)).await?;
    if resp.status_code() == 404 {
        return Ok(None);
    }
    let body = resp.expect_status(200)?.json()?;
    Ok(Some(as_array(&body, "vendor mappings")?.clone()))
}

async fn vendor_mappings_list(ctx: &ProbeContext) -> CheckResult {
    let project_id = ctx.fixtures.project_id();
    let Some(list) = mappings(ctx, project_id).await? else {
        return skipped(format!("project {project_id} not found"));
    };
    require_first_item_fields(&list, "vendor mapping", MAPPING_FIELDS)?;
    passed()
}

async fn editable(ctx: &ProbeContext, project_id: &str) -> Result<bool, ProbeError> {
    let resp = ctx.session.get(&endpoints::project_finance(project_id)).await?;
    if resp.status_code() != 200 {
        return Ok(false);
    }
    let body = resp.json()?;
    Ok(body
        .get("can_edit_vendor_mapping")
        .and_then(Value::as_bool)
        .unwrap_or(false))
}

/// The configured project when it still accepts mapping edits, else the first one that does.
async fn editable_project(ctx: &ProbeContext) -> Result<Option<String>, ProbeError> {
    let configured = ctx.fixtures.project_id();
    if editable(ctx, configured).await? {
        return Ok(Some(configured.to_string()));
    }
    let body = ctx
        .session
        .get(endpoints::PROJECT_FINANCE)
        .await?
        .expect_status(200)?
        .json()?;
    for project in as_array(&body, "project finance list")? {
        let id = string(project, "project_id")?;
        if editable(ctx, id).await? {
            return Ok(Some(id.to_string()));
        }
    }
    Ok(None)
}

async fn create_mapping(ctx: &ProbeContext, slot: &mut Option<CreatedMapping>) -> CheckResult {
    let Some(project_id) = editable_project(ctx).await? else {
        return skipped("no project accepts vendor mapping edits");
    };
    debug!(event = "editable_project", project_id = %project_id);
    let payload = ctx.fixtures.vendor_mapping(&project_id, "Modular", 50_000.0);
    let resp = ctx.session.post_json(endpoints::VENDOR_MAPPINGS, &payload).await?;
    if locked_by_progress(&resp) {
        return skipped(format!("cannot create mapping: {}", resp.detail()));
    }
    let mapping: VendorMapping = resp.expect_status(200)?.json_as()?;
    ensure_eq_str(&mapping.vendor_name, &payload.vendor_name, "mapping vendor_name")?;
    ensure_eq_str(&mapping.category, &payload.category, "mapping category")?;
    ensure_money(mapping.planned_amount, payload.planned_amount, "mapping planned_amount")?;
    *slot = Some(CreatedMapping {
        mapping_id: mapping.mapping_id,
        project_id,
    });
    passed()
}

async fn update_mapping(ctx: &ProbeContext, created: Option<&CreatedMapping>) -> CheckResult {
    let Some(created) = created else {
        return skipped("no vendor mapping was created");
    };
    let planned_amount = 75_000.0;
    let patch = ctx.fixtures.vendor_mapping_update(planned_amount);
    let path = endpoints::vendor_mapping(&created.mapping_id);
    let resp = ctx.session.put_json(&path, &patch).await?;
    if locked_by_progress(&resp) {
        return skipped(format!("cannot update mapping: {}", resp.detail()));
    }
    let mapping: VendorMapping = resp.expect_status(200)?.json_as()?;
    let vendor_name = patch.vendor_name.as_deref().unwrap_or_default();
    ensure_eq_str(&mapping.vendor_name, vendor_name, "updated vendor_name")?;
    ensure_money(mapping.planned_amount, planned_amount, "updated planned_amount")?;
    passed()
}

async fn delete_mapping(ctx: &ProbeContext, created: Option<&CreatedMapping>) -> CheckResult {
    let Some(created) = created else {
        return skipped("no vendor mapping was created");
    };
    let resp = ctx.session.delete(&endpoints::vendor_mapping(&created.mapping_id)).await?;
    if locked_by_progress(&resp) {
        return skipped(format!("cannot delete mapping: {}", resp.detail()));
    }
    let body = resp.expect_status(200)?.json()?;
    ensure(boolean(&body, "success")?, "delete did not report success")?;

    if let Some(list) = mappings(ctx, &created.project_id).await? {
        let id = created.mapping_id.as_str();
        let still_there = list
            .iter()
            .any(|m| m.get("mapping_id").and_then(Value::as_str) == Some(id));
        ensure(!still_there, format!("mapping {id} still listed after delete"))?;
    }
    passed()
}

async fn invalid_category(ctx: &ProbeContext) -> CheckResult {
    let category = "InvalidCategory";
    let payload = ctx.fixtures.vendor_mapping(ctx.fixtures.project_id(), category, 10_000.0);
    let resp = ctx.session.post_json(endpoints::VENDOR_MAPPINGS, &payload).await?;
    match resp.status_code() {
        404 => skipped(format!("project {} not found", payload.project_id)),
        400 if contains_ci(&resp.detail(), "spending") => {
            skipped("spending started, validation unreachable")
        }
        400 => passed(),
        200 => {
            if let Ok(mapping) = resp.json_as::<VendorMapping>() {
                let path = endpoints::vendor_mapping(&mapping.mapping_id);
                if let Err(e) = ctx.session.delete(&path).await {
                    warn!(event = "cleanup", error = %e, "invalid mapping not removed");
                }
            }
            Err(ProbeError::Assertion(format!("category {category} was accepted")))
        }
        _ => Err(resp.status_error(400)),
    }
}

async fn invalid_project(ctx: &ProbeContext) -> CheckResult {
    let payload = ctx.fixtures.vendor_mapping(MISSING_PROJECT, "Modular", 10_000.0);
    ctx.session
        .post_json(endpoints::VENDOR_MAPPINGS, &payload)
        .await?
        .expect_status(404)?;
    passed()
}

async fn update_missing(ctx: &ProbeContext) -> CheckResult {
    let patch = ctx.fixtures.vendor_mapping_update(10_000.0);
    ctx.session
        .put_json(&endpoints::vendor_mapping(MISSING_MAPPING), &patch)
        .await?
        .expect_status(404)?;
    passed()
}

async fn delete_missing(ctx: &ProbeContext) -> CheckResult {
    ctx.session
        .delete(&endpoints::vendor_mapping(MISSING_MAPPING))
        .await?
        .expect_status(404)?;
    passed()
}

async fn edit_lock_flag(ctx: &ProbeContext) -> CheckResult {
    let project_id = ctx.fixtures.project_id();
    let resp = ctx.session.get(&endpoints::project_finance(project_id)).await?;
    if resp.status_code() == 404 {
        return skipped(format!("project {project_id} not found"));
    }
    let body = resp.expect_status(200)?.json()?;
    let flag = |key: &str| body.get(key).and_then(Value::as_bool).unwrap_or(false);
    let (spending, production) = (flag("spending_started"), flag("production_started"));
    let expected = can_edit_vendor_mapping(spending, production);
    let actual = boolean(&body, "can_edit_vendor_mapping")?;
    ensure(
        actual == expected,
        format!(
            "can_edit_vendor_mapping is {actual}, expected {expected} \
             (spending_started={spending}, production_started={production})"
        ),
    )?;
    passed()
}
