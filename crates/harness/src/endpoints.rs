//! Backend paths probed by the suites.

pub const SETUP_LOCAL_ADMIN: &str = "/api/auth/setup-local-admin";
pub const LOCAL_LOGIN: &str = "/api/auth/local-login";
pub const AUTH_ME: &str = "/api/auth/me";

pub const LIABILITIES: &str = "/api/finance/liabilities";
pub const LIABILITIES_SUMMARY: &str = "/api/finance/liabilities/summary";
pub const VENDORS: &str = "/api/finance/vendors";
pub const PNL_SNAPSHOT: &str = "/api/finance/pnl-snapshot";
pub const FOUNDER_DASHBOARD: &str = "/api/finance/founder-dashboard";
pub const PROJECTS: &str = "/api/projects";

pub const ACCOUNTS: &str = "/api/accounting/accounts";
pub const CATEGORIES: &str = "/api/accounting/categories";
pub const TRANSACTIONS: &str = "/api/accounting/transactions";
pub const ACCOUNTING_PROJECTS_LIST: &str = "/api/accounting/projects-list";
pub const ACCOUNT_BALANCES_REPORT: &str = "/api/accounting/reports/account-balances";
pub const CATEGORY_SUMMARY_REPORT: &str = "/api/accounting/reports/category-summary";

pub const ATTACHMENT_UPLOAD: &str = "/api/finance/attachments/upload";
pub const ATTACHMENTS_BY_IDS: &str = "/api/finance/attachments/by-ids";

pub const RECEIPTS: &str = "/api/finance/receipts";
pub const COMPANY_SETTINGS: &str = "/api/finance/company-settings";

pub const VENDOR_CATEGORIES: &str = "/api/finance/vendor-categories";
pub const PROJECT_FINANCE: &str = "/api/finance/project-finance";
pub const VENDOR_MAPPINGS: &str = "/api/finance/vendor-mappings";

pub const ROLES_AVAILABLE: &str = "/api/roles/available";
pub const PERMISSIONS_AVAILABLE: &str = "/api/permissions/available";

pub const REPORTS_AVAILABLE: &str = "/api/finance/reports/available";
pub const CASH_FLOW_REPORT: &str = "/api/finance/reports/cash-flow";
pub const DAILY_CLOSING: &str = "/api/finance/daily-closing";
pub const DAILY_CLOSING_HISTORY: &str = "/api/finance/daily-closing/history";

pub fn liability(id: &str) -> String {
    format!("{LIABILITIES}/{id}")
}

pub fn settle_liability(id: &str) -> String {
    format!("{LIABILITIES}/{id}/settle")
}

pub fn project_profit(project_id: &str) -> String {
    format!("/api/finance/project-profit/{project_id}")
}

pub fn daily_summary(date: &str) -> String {
    format!("/api/accounting/daily-summary/{date}")
}

pub fn close_day(date: &str) -> String {
    format!("/api/accounting/close-day/{date}")
}

pub fn attachments_for(entity_type: &str, entity_id: &str) -> String {
    format!("/api/finance/attachments/{entity_type}/{entity_id}")
}

pub fn attachment_download(id: &str) -> String {
    format!("/api/finance/attachments/download/{id}")
}

pub fn attachment(id: &str) -> String {
    format!("/api/finance/attachments/{id}")
}

pub fn receipt(id: &str) -> String {
    format!("{RECEIPTS}/{id}")
}

pub fn receipt_pdf(id: &str) -> String {
    format!("{RECEIPTS}/{id}/pdf")
}

pub fn project_finance(project_id: &str) -> String {
    format!("{PROJECT_FINANCE}/{project_id}")
}

pub fn vendor_mapping(mapping_id: &str) -> String {
    format!("{VENDOR_MAPPINGS}/{mapping_id}")
}

pub fn role_default_permissions(role: &str) -> String {
    format!("/api/roles/{role}/default-permissions")
}
