//! Cash book: accounts, categories, transactions and daily closing.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Inflow,
    Outflow,
}

impl TransactionType {
    /// Change applied to the account's `current_balance`.
    pub fn balance_delta(self, amount: f64) -> f64 {
        match self {
            Self::Inflow => amount,
            Self::Outflow => -amount,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inflow => "inflow",
            Self::Outflow => "outflow",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub account_name: String,
    pub account_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub opening_balance: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub account_name: String,
    pub account_type: String,
    #[serde(default)]
    pub opening_balance: Option<f64>,
    pub current_balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    /// ISO-8601 date-time; the calendar day decides which daily closing it belongs to.
    pub transaction_date: String,
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub mode: String,
    pub category_id: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_to: Option<String>,
    pub remarks: String,
}

impl NewTransaction {
    pub fn day(&self) -> Option<NaiveDate> {
        self.transaction_date
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub amount: f64,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

pub const TRANSACTION_LIST_FIELDS: &[&str] = &[
    "transaction_id",
    "amount",
    "transaction_type",
    "account_name",
    "category_name",
];

pub const DAILY_SUMMARY_FIELDS: &[&str] = &[
    "date",
    "is_locked",
    "total_inflow",
    "total_outflow",
    "net_change",
    "transaction_count",
    "accounts",
];

pub const DAILY_SUMMARY_ACCOUNT_FIELDS: &[&str] = &[
    "account_id",
    "account_name",
    "opening_balance",
    "closing_balance",
    "inflow",
    "outflow",
];
