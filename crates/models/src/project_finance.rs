use serde::{Deserialize, Serialize};

/// Vendor categories a mapping may use; anything else is a 400.
pub const VENDOR_CATEGORIES: &[&str] = &[
    "Modular",
    "Non-Modular",
    "Installation",
    "Transport",
    "Other",
];

pub fn is_vendor_category(name: &str) -> bool {
    VENDOR_CATEGORIES.contains(&name)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVendorMapping {
    pub project_id: String,
    pub vendor_name: String,
    pub category: String,
    pub planned_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial update; unset fields are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorMappingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorMapping {
    pub mapping_id: String,
    pub project_id: String,
    pub vendor_name: String,
    pub category: String,
    pub planned_amount: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySettingsUpdate {
    pub company_name: String,
    pub authorized_signatory: String,
}

/// Editing rule: mappings freeze once money is spent or production begins.
pub fn can_edit_vendor_mapping(spending_started: bool, production_started: bool) -> bool {
    !(spending_started || production_started)
}

pub const PROJECT_FINANCE_LIST_FIELDS: &[&str] = &[
    "project_id",
    "pid",
    "project_name",
    "client_name",
    "contract_value",
    "total_received",
    "planned_cost",
    "actual_cost",
    "safe_surplus",
    "has_overspend",
];

pub const PROJECT_FINANCE_SUMMARY_FIELDS: &[&str] = &[
    "contract_value",
    "total_received",
    "planned_cost",
    "actual_cost",
    "remaining_liability",
    "safe_surplus",
    "has_overspend",
];

pub const PROJECT_FINANCE_DETAIL_FIELDS: &[&str] = &[
    "project",
    "summary",
    "vendor_mappings",
    "transactions",
    "comparison",
    "can_edit_vendor_mapping",
];

pub const COMPANY_SETTINGS_FIELDS: &[&str] = &[
    "company_name",
    "company_address",
    "company_gstin",
    "authorized_signatory",
];

pub const RECEIPT_LIST_FIELDS: &[&str] = &[
    "receipt_number",
    "payment_date",
    "amount",
    "payment_mode",
    "account_name",
    "receipt_id",
];

pub const RECEIPT_DETAIL_FIELDS: &[&str] = &[
    "receipt_number",
    "amount",
    "payment_date",
    "payment_mode",
    "account_name",
    "stage_name",
    "total_received",
    "balance_remaining",
    "project",
];
