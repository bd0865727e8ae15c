//! Ephemeral test data.
//!
//! Every created name carries the configured prefix and a per-run suffix so
//! that probe data is recognisable and never collides with real records.

use chrono::{Duration, Local, NaiveDate};
use configs::FixtureConfig;
use models::accounting::{NewAccount, NewCategory, NewTransaction, TransactionType};
use models::liability::{NewLiability, SettleLiability};
use models::project_finance::{NewVendorMapping, VendorMappingPatch};

#[derive(Debug, Clone)]
pub struct Fixtures {
    prefix: String,
    suffix: String,
    project_id: String,
    locked_day_offset: i64,
    past_summary_offset: i64,
}

impl Fixtures {
    pub fn new(cfg: &FixtureConfig) -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let suffix = format!("{}_{}", Local::now().format("%H%M%S"), &token[..6]);
        Self {
            prefix: cfg.prefix.clone(),
            suffix,
            project_id: cfg.project_id.clone(),
            locked_day_offset: cfg.locked_day_offset_days,
            past_summary_offset: cfg.past_summary_offset_days,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// `<prefix><base>` without the run suffix.
    pub fn prefixed(&self, base: &str) -> String {
        format!("{}{}", self.prefix, base)
    }

    /// `<prefix><base>_<HHMMSS>_<token>`, unique per run.
    pub fn unique(&self, base: &str) -> String {
        format!("{}{}_{}", self.prefix, base, self.suffix)
    }

    pub fn today() -> String {
        Local::now().date_naive().format("%Y-%m-%d").to_string()
    }

    pub fn days_ago(days: i64) -> String {
        Self::day(-days).format("%Y-%m-%d").to_string()
    }

    pub fn days_from_now(days: i64) -> String {
        Self::day(days).format("%Y-%m-%d").to_string()
    }

    pub fn now_iso() -> String {
        Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
    }

    /// Mid-morning timestamp on the given `YYYY-MM-DD` day.
    pub fn iso_on(day: &str) -> String {
        format!("{day}T10:00:00")
    }

    fn day(offset: i64) -> NaiveDate {
        Local::now().date_naive() + Duration::days(offset)
    }

    /// Past day the accounting suite closes and then writes against.
    pub fn locked_day(&self) -> String {
        Self::days_ago(self.locked_day_offset)
    }

    pub fn past_summary_day(&self) -> String {
        Self::days_ago(self.past_summary_offset)
    }

    pub fn liability(&self, amount: f64, category: &str) -> NewLiability {
        NewLiability {
            vendor_name: self.unique("Vendor"),
            category: category.to_string(),
            amount,
            due_date: Some(Self::days_from_now(30)),
            description: Some("Probe liability for automated testing".into()),
            source: "manual".into(),
        }
    }

    pub fn settlement(&self, amount: f64) -> SettleLiability {
        SettleLiability {
            amount,
            remarks: self.prefixed("Settlement"),
        }
    }

    pub fn account(&self, opening_balance: f64) -> NewAccount {
        NewAccount {
            account_name: self.unique("Bank Account"),
            account_type: "bank".into(),
            bank_name: Some("Test Bank".into()),
            branch: Some("Test Branch".into()),
            category: Some("Company Bank (Secondary)".into()),
            opening_balance,
            is_active: true,
        }
    }

    pub fn category(&self) -> NewCategory {
        NewCategory {
            name: self.unique("Category"),
            description: Some("Probe category for automated testing".into()),
            is_active: true,
        }
    }

    pub fn transaction(
        &self,
        account_id: &str,
        category_id: &str,
        transaction_type: TransactionType,
        amount: f64,
        transaction_date: String,
    ) -> NewTransaction {
        let mode = match transaction_type {
            TransactionType::Outflow => "cash",
            TransactionType::Inflow => "bank_transfer",
        };
        NewTransaction {
            transaction_date,
            transaction_type,
            amount,
            mode: mode.into(),
            category_id: category_id.to_string(),
            account_id: account_id.to_string(),
            paid_to: Some(self.prefixed("Counterparty")),
            remarks: self.prefixed(&format!("{transaction_type} probe transaction")),
        }
    }

    pub fn vendor_mapping(
        &self,
        project_id: &str,
        category: &str,
        planned_amount: f64,
    ) -> NewVendorMapping {
        NewVendorMapping {
            project_id: project_id.to_string(),
            vendor_name: self.prefixed("Vendor_Create"),
            category: category.to_string(),
            planned_amount,
            notes: Some("Probe vendor mapping".into()),
        }
    }

    pub fn vendor_mapping_update(&self, planned_amount: f64) -> VendorMappingPatch {
        VendorMappingPatch {
            vendor_name: Some(self.prefixed("Vendor_Updated")),
            planned_amount: Some(planned_amount),
            notes: Some("Updated by probe".into()),
            ..Default::default()
        }
    }

    /// Entity id for attachment uploads, unique per run.
    pub fn entity_id(&self, base: &str) -> String {
        format!("{}_{}", base, self.suffix)
    }
}

/// In-memory file for multipart uploads.
#[derive(Debug, Clone)]
pub struct SampleFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl SampleFile {
    pub fn pdf(file_name: &str, text: &str) -> Self {
        let mut bytes = b"%PDF-1.4 ".to_vec();
        bytes.extend_from_slice(text.as_bytes());
        Self {
            file_name: file_name.into(),
            mime_type: "application/pdf",
            bytes,
        }
    }

    pub fn jpeg(file_name: &str) -> Self {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(b"\x00\x10JFIF\x00");
        bytes.extend(std::iter::repeat(0u8).take(100));
        Self {
            file_name: file_name.into(),
            mime_type: "image/jpeg",
            bytes,
        }
    }

    pub fn png(file_name: &str) -> Self {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend(std::iter::repeat(0u8).take(100));
        Self {
            file_name: file_name.into(),
            mime_type: "image/png",
            bytes,
        }
    }

    /// A type the backend must refuse.
    pub fn text(file_name: &str) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: "text/plain",
            bytes: b"This is a text file".to_vec(),
        }
    }
}
