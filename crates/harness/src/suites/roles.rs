//! Role catalog, per-role default permissions and the permission reference.

use async_trait::async_trait;
use models::roles::{
    DefaultPermissions, RoleCatalog, CASHBOOK_GROUP_PERMISSIONS, CONTROLS_GROUP_PERMISSIONS,
    CRM_PERMISSION_GROUPS, CRM_ROLES, FINANCE_PERMISSION_GROUPS, FINANCE_ROLES, LEADERSHIP_ROLES,
    LEGACY_FINANCE_PERMISSIONS, ROLE_EXPECTATIONS,
};
use serde_json::Value;

use crate::assert::{as_array, as_object, ensure, ensure_eq_str, field, require_fields, string};
use crate::endpoints;
use crate::error::ProbeError;
use crate::report::{passed, CheckResult, SuiteReport};
use crate::suite::{ProbeContext, Suite};
use crate::suites::anonymous_get_rejected;

pub struct RolesSuite;

const CHECKS: &[&str] = &[
    "roles_available",
    "finance_roles_present",
    "crm_roles_present",
    "finance_role_categories",
    "default_permissions",
    "unknown_role_not_found",
    "permission_groups",
    "cashbook_group_permissions",
    "controls_group_permissions",
    "legacy_finance_group",
    "permissions_reference",
    "roles_available_requires_auth",
    "default_permissions_requires_auth",
    "permissions_available_requires_auth",
];

const ROLE_FIELDS: &[&str] = &["id", "name", "category", "description"];

#[async_trait]
impl Suite for RolesSuite {
    fn name(&self) -> &'static str {
        "roles"
    }

    fn checks(&self) -> &'static [&'static str] {
        CHECKS
    }

    async fn run(&self, ctx: &ProbeContext, report: &mut SuiteReport) {
        report.run("roles_available", roles_available(ctx)).await;
        let finance_roles = roles_present(ctx, &[FINANCE_ROLES, LEADERSHIP_ROLES]);
        report.run("finance_roles_present", finance_roles).await;
        report
            .run("crm_roles_present", roles_present(ctx, &[CRM_ROLES]))
            .await;
        report.run("finance_role_categories", role_categories(ctx)).await;
        report.run("default_permissions", default_permissions(ctx)).await;
        report.run("unknown_role_not_found", unknown_role(ctx)).await;
        report.run("permission_groups", permission_groups(ctx)).await;
        let cashbook = group_permissions(ctx, "finance_cashbook", CASHBOOK_GROUP_PERMISSIONS);
        report.run("cashbook_group_permissions", cashbook).await;
        let controls = group_permissions(ctx, "finance_controls", CONTROLS_GROUP_PERMISSIONS);
        report.run("controls_group_permissions", controls).await;
        let legacy = group_permissions(ctx, "finance", LEGACY_FINANCE_PERMISSIONS);
        report.run("legacy_finance_group", legacy).await;
        report.run("permissions_reference", permissions_reference(ctx)).await;
        report
            .run(
                "roles_available_requires_auth",
                anonymous_get_rejected(&ctx.anon, endpoints::ROLES_AVAILABLE),
            )
            .await;
        let junior_defaults = endpoints::role_default_permissions("JuniorAccountant");
        report
            .run(
                "default_permissions_requires_auth",
                anonymous_get_rejected(&ctx.anon, &junior_defaults),
            )
            .await;
        report
            .run(
                "permissions_available_requires_auth",
                anonymous_get_rejected(&ctx.anon, endpoints::PERMISSIONS_AVAILABLE),
            )
            .await;
    }
}

async fn catalog_json(ctx: &ProbeContext) -> Result<Value, ProbeError> {
    ctx.session
        .get(endpoints::ROLES_AVAILABLE)
        .await?
        .expect_status(200)?
        .json()
}

async fn catalog(ctx: &ProbeContext) -> Result<RoleCatalog, ProbeError> {
    ctx.session
        .get(endpoints::ROLES_AVAILABLE)
        .await?
        .expect_status(200)?
        .json_as()
}

async fn roles_available(ctx: &ProbeContext) -> CheckResult {
    let body = catalog_json(ctx).await?;
    let roles = as_array(field(&body, "roles")?, "roles")?;
    ensure(!roles.is_empty(), "role list is empty")?;
    for role in roles {
        require_fields(role, "role", ROLE_FIELDS)?;
    }
    let categories = as_array(field(&body, "categories")?, "categories")?;
    for expected in ["Finance", "Leadership"] {
        ensure(
            categories.iter().any(|c| c.as_str() == Some(expected)),
            format!("role categories lack {expected}"),
        )?;
    }
    passed()
}

async fn roles_present(ctx: &ProbeContext, groups: &[&[&str]]) -> CheckResult {
    let catalog = catalog(ctx).await?;
    let missing: Vec<&str> = groups
        .iter()
        .flat_map(|ids| catalog.missing(ids))
        .collect();
    ensure(
        missing.is_empty(),
        format!("roles missing from catalog: {missing:?}"),
    )?;
    passed()
}

async fn role_categories(ctx: &ProbeContext) -> CheckResult {
    let catalog = catalog(ctx).await?;
    let expected = FINANCE_ROLES
        .iter()
        .map(|id| (*id, "Finance"))
        .chain(LEADERSHIP_ROLES.iter().map(|id| (*id, "Leadership")));
    for (id, category) in expected {
        let role = catalog
            .find(id)
            .ok_or_else(|| ProbeError::Assertion(format!("role {id} missing from catalog")))?;
        ensure_eq_str(&role.category, category, &format!("{id} category"))?;
    }
    passed()
}

/// Every role with an expectation table, reported together.
async fn default_permissions(ctx: &ProbeContext) -> CheckResult {
    let mut problems = Vec::new();
    for expectation in ROLE_EXPECTATIONS {
        let perms: DefaultPermissions = ctx
            .session
            .get(&endpoints::role_default_permissions(expectation.role))
            .await?
            .expect_status(200)?
            .json_as()?;
        if perms.role != expectation.role {
            problems.push(format!("{}: role echoed as {}", expectation.role, perms.role));
        }
        let (missing, forbidden) = expectation.diff(&perms);
        if !missing.is_empty() {
            problems.push(format!("{} lacks {missing:?}", expectation.role));
        }
        if !forbidden.is_empty() {
            problems.push(format!("{} must not have {forbidden:?}", expectation.role));
        }
    }
    ensure(problems.is_empty(), problems.join("; "))?;
    passed()
}

async fn unknown_role(ctx: &ProbeContext) -> CheckResult {
    ctx.session
        .get(&endpoints::role_default_permissions("InvalidRole123"))
        .await?
        .expect_status(404)?;
    passed()
}

async fn permissions_json(ctx: &ProbeContext) -> Result<Value, ProbeError> {
    ctx.session
        .get(endpoints::PERMISSIONS_AVAILABLE)
        .await?
        .expect_status(200)?
        .json()
}

async fn permission_groups(ctx: &ProbeContext) -> CheckResult {
    let body = permissions_json(ctx).await?;
    let groups = as_object(field(&body, "permission_groups")?, "permission_groups")?;
    let missing: Vec<&str> = FINANCE_PERMISSION_GROUPS
        .iter()
        .chain(CRM_PERMISSION_GROUPS)
        .copied()
        .filter(|g| !groups.contains_key(*g))
        .collect();
    ensure(
        missing.is_empty(),
        format!("permission groups missing: {missing:?}"),
    )?;
    passed()
}

async fn group_permissions(ctx: &ProbeContext, group: &str, expected: &[&str]) -> CheckResult {
    let body = permissions_json(ctx).await?;
    let groups = field(&body, "permission_groups")?;
    let entry = field(groups, group)?;
    let ids = as_array(field(entry, "permissions")?, group)?
        .iter()
        .map(|p| string(p, "id"))
        .collect::<Result<Vec<_>, _>>()?;
    let missing: Vec<&str> = expected
        .iter()
        .copied()
        .filter(|p| !ids.contains(p))
        .collect();
    ensure(missing.is_empty(), format!("group {group} lacks {missing:?}"))?;
    passed()
}

async fn permissions_reference(ctx: &ProbeContext) -> CheckResult {
    let body = permissions_json(ctx).await?;
    require_fields(
        &body,
        "permissions reference",
        &["available_roles", "default_role_permissions"],
    )?;
    passed()
}
