//! Role catalog and default permission expectations.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInfo {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCatalog {
    pub roles: Vec<RoleInfo>,
    pub categories: Vec<String>,
}

impl RoleCatalog {
    pub fn find(&self, id: &str) -> Option<&RoleInfo> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn missing<'a>(&self, ids: &[&'a str]) -> Vec<&'a str> {
        ids.iter()
            .copied()
            .filter(|id| self.find(id).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultPermissions {
    pub role: String,
    pub default_permissions: Vec<String>,
}

impl DefaultPermissions {
    pub fn has(&self, perm: &str) -> bool {
        self.default_permissions.iter().any(|p| p == perm)
    }
}

pub const FINANCE_ROLES: &[&str] = &[
    "JuniorAccountant",
    "SeniorAccountant",
    "FinanceManager",
    "CharteredAccountant",
];
pub const LEADERSHIP_ROLES: &[&str] = &["Founder"];
pub const CRM_ROLES: &[&str] = &[
    "Designer",
    "SalesManager",
    "PreSales",
    "DesignManager",
    "ProductionOpsManager",
];

/// What a role's default permission set must and must not contain.
#[derive(Debug, Clone, Copy)]
pub struct RoleExpectation {
    pub role: &'static str,
    pub includes: &'static [&'static str],
    pub excludes: &'static [&'static str],
}

impl RoleExpectation {
    /// Returns (missing, forbidden_present).
    pub fn diff(&self, perms: &DefaultPermissions) -> (Vec<&'static str>, Vec<&'static str>) {
        let missing = self
            .includes
            .iter()
            .copied()
            .filter(|p| !perms.has(p))
            .collect();
        let forbidden = self
            .excludes
            .iter()
            .copied()
            .filter(|p| perms.has(p))
            .collect();
        (missing, forbidden)
    }
}

pub const ROLE_EXPECTATIONS: &[RoleExpectation] = &[
    RoleExpectation {
        role: "JuniorAccountant",
        includes: &["finance.cashbook.view", "finance.cashbook.create"],
        excludes: &[
            "finance.cashbook.delete",
            "finance.cashbook.edit",
            "finance.daily_closing.lock",
        ],
    },
    RoleExpectation {
        role: "SeniorAccountant",
        includes: &[
            "finance.cashbook.edit",
            "finance.cashbook.verify",
            "finance.daily_closing.lock",
            "finance.invoices.create",
        ],
        excludes: &["finance.cashbook.delete"],
    },
    RoleExpectation {
        role: "FinanceManager",
        includes: &[
            "finance.cashbook.delete",
            "finance.transaction.reverse",
            "finance.project.override_budget",
            "finance.reports.profit",
            "finance.reports.margin",
            "finance.writeoff.approve",
            "finance.cancellation.mark",
        ],
        excludes: &[],
    },
    RoleExpectation {
        role: "CharteredAccountant",
        includes: &[
            "finance.cashbook.view",
            "finance.reports.view",
            "finance.audit_log.view",
            "finance.reports.profit",
            "finance.reports.margin",
        ],
        excludes: &[
            "finance.cashbook.create",
            "finance.cashbook.edit",
            "finance.cashbook.delete",
            "finance.invoices.create",
            "finance.expenses.create",
        ],
    },
    RoleExpectation {
        role: "Founder",
        includes: &[
            "projects.view_all",
            "leads.view_all",
            "finance.cashbook.view",
            "finance.founder_dashboard",
            "finance.project.override_budget",
            "finance.writeoff.approve",
            "finance.expenses.approve",
        ],
        excludes: &[],
    },
    RoleExpectation {
        role: "Designer",
        includes: &["leads.view", "projects.view", "milestones.update.design"],
        excludes: &[],
    },
    RoleExpectation {
        role: "SalesManager",
        includes: &["leads.view_all", "presales.view"],
        excludes: &[],
    },
];

pub const FINANCE_PERMISSION_GROUPS: &[&str] = &[
    "finance_cashbook",
    "finance_accounts",
    "finance_documents",
    "finance_project",
    "finance_expenses",
    "finance_reports",
    "finance_masters",
    "finance_controls",
];

pub const CRM_PERMISSION_GROUPS: &[&str] = &[
    "presales",
    "leads",
    "projects",
    "milestones",
    "warranty",
    "academy",
];

pub const CASHBOOK_GROUP_PERMISSIONS: &[&str] = &[
    "finance.cashbook.view",
    "finance.cashbook.create",
    "finance.cashbook.edit",
    "finance.cashbook.delete",
    "finance.cashbook.verify",
    "finance.daily_closing.view",
    "finance.daily_closing.create",
    "finance.daily_closing.lock",
];

pub const CONTROLS_GROUP_PERMISSIONS: &[&str] = &[
    "finance.writeoff.approve",
    "finance.exception.mark",
    "finance.audit_log.view",
    "finance.cancellation.mark",
];

pub const LEGACY_FINANCE_PERMISSIONS: &[&str] = &[
    "finance.view_dashboard",
    "finance.view_cashbook",
    "finance.add_transaction",
];
