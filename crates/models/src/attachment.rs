//! Document attachments (proof layer).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Entities an attachment can hang off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentEntity {
    Cashbook,
    Expense,
    Project,
    Liability,
}

impl AttachmentEntity {
    pub const ALL: [AttachmentEntity; 4] = [
        Self::Cashbook,
        Self::Expense,
        Self::Project,
        Self::Liability,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cashbook => "cashbook",
            Self::Expense => "expense",
            Self::Project => "project",
            Self::Liability => "liability",
        }
    }
}

impl fmt::Display for AttachmentEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttachmentEntity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| ModelError::UnknownVariant {
                kind: "entity type",
                value: s.into(),
            })
    }
}

/// MIME types the backend accepts for uploads.
pub const ALLOWED_MIME_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub mime_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub uploaded_by: String,
    pub uploaded_by_name: String,
    pub uploaded_at: String,
}

impl Attachment {
    /// Storage path must look like `finance/YYYY/MM/<name>`.
    pub fn validate_file_path(&self) -> Result<(), ModelError> {
        let parts: Vec<&str> = self.file_path.split('/').collect();
        if parts.len() < 4 || parts[0] != "finance" {
            return Err(ModelError::Validation(format!(
                "file_path {:?} is not finance/YYYY/MM/<name>",
                self.file_path
            )));
        }
        let digits = |s: &str, n: usize| s.len() == n && s.chars().all(|c| c.is_ascii_digit());
        if !digits(parts[1], 4) || !digits(parts[2], 2) {
            return Err(ModelError::Validation(format!(
                "file_path {:?} has malformed year/month segments",
                self.file_path
            )));
        }
        Ok(())
    }
}

pub const ATTACHMENT_FIELDS: &[&str] = &[
    "attachment_id",
    "entity_type",
    "entity_id",
    "file_name",
    "file_path",
    "file_size",
    "mime_type",
    "description",
    "uploaded_by",
    "uploaded_by_name",
    "uploaded_at",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentEnvelope {
    pub success: bool,
    pub attachment: Attachment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentList {
    pub attachments: Vec<serde_json::Value>,
    #[serde(default)]
    pub count: Option<u64>,
}
