//! Liability register and P&L views.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::money_eq;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiabilityStatus {
    Open,
    PartiallySettled,
    Closed,
}

impl LiabilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PartiallySettled => "partially_settled",
            Self::Closed => "closed",
        }
    }

    /// Status the register must report once `settled` of `amount` has been paid.
    pub fn after_settlement(amount: f64, settled: f64) -> Self {
        if money_eq(settled, 0.0) {
            Self::Open
        } else if money_eq(amount - settled, 0.0) || settled > amount {
            Self::Closed
        } else {
            Self::PartiallySettled
        }
    }
}

impl fmt::Display for LiabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LiabilityStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "partially_settled" => Ok(Self::PartiallySettled),
            "closed" => Ok(Self::Closed),
            other => Err(ModelError::UnknownVariant {
                kind: "liability status",
                value: other.into(),
            }),
        }
    }
}

/// Expected outcome of settling `payment` against a liability with `remaining` outstanding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettlementExpectation {
    Accepted {
        remaining: f64,
        status: LiabilityStatus,
    },
    Rejected,
}

pub fn expect_settlement(amount: f64, already_settled: f64, payment: f64) -> SettlementExpectation {
    let remaining = amount - already_settled;
    if payment <= 0.0 || payment - remaining > crate::MONEY_EPSILON {
        return SettlementExpectation::Rejected;
    }
    let settled = already_settled + payment;
    SettlementExpectation::Accepted {
        remaining: (amount - settled).max(0.0),
        status: LiabilityStatus::after_settlement(amount, settled),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLiability {
    pub vendor_name: String,
    pub category: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleLiability {
    pub amount: f64,
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liability {
    pub liability_id: String,
    pub vendor_name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub amount_settled: f64,
    pub amount_remaining: f64,
    pub status: LiabilityStatus,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// P&L reporting window accepted by `/api/finance/pnl-snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PnlPeriod {
    Month,
    Quarter,
    Custom {
        start_date: String,
        end_date: String,
    },
}

impl PnlPeriod {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Month => vec![("period", "month".into())],
            Self::Quarter => vec![("period", "quarter".into())],
            Self::Custom {
                start_date,
                end_date,
            } => vec![
                ("period", "custom".into()),
                ("start_date", start_date.clone()),
                ("end_date", end_date.clone()),
            ],
        }
    }
}

/// Top-level keys every P&L snapshot carries.
pub const PNL_FIELDS: &[&str] = &[
    "period_label",
    "start_date",
    "end_date",
    "revenue",
    "execution_costs",
    "operating_expenses",
    "gross_profit",
    "net_operating_profit",
    "cash_profit",
    "accounting_profit",
];

pub const OPEX_FIELDS: &[&str] = &["salaries", "office", "marketing", "travel", "misc"];

pub const PROFIT_DIFFERENCE_FACTORS: &[&str] = &[
    "advances_locked_pct",
    "open_liabilities",
    "committed_not_paid",
];

pub const PROJECT_PROFIT_FIELDS: &[&str] = &[
    "project_id",
    "contract_value",
    "planned_cost",
    "actual_cost",
    "total_received",
    "projected_profit",
    "projected_profit_pct",
    "realised_profit",
    "realised_profit_pct",
    "execution_margin_remaining",
];
