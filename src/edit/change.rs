//! Update requests and responses.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EditError;
use crate::patch::PatchOutcome;
use crate::scan::EditableType;

/// One update as submitted by the editor client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    pub id: String,
    pub value: String,
    #[serde(default, alias = "oldValue")]
    pub original: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default, alias = "lineHint")]
    pub line_number: Option<usize>,
    #[serde(default, rename = "type")]
    pub content_type: Option<EditableType>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl UpdateItem {
    /// Locale the item applies to.
    pub fn locale_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.locale.as_deref().unwrap_or(default)
    }

    /// Validate and convert into a change.
    pub fn into_change(self, default_locale: &str) -> Result<ContentChange, EditError> {
        if self.id.trim().is_empty() {
            return Err(EditError::validation("missing content id"));
        }
        let old_value = self
            .original
            .clone()
            .or_else(|| {
                self.metadata
                    .get("original")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|old| !old.is_empty())
            .ok_or_else(|| {
                EditError::validation(format!("`{}` carries no original value", self.id))
            })?;

        Ok(ContentChange {
            locale: self.locale_or(default_locale).to_string(),
            id: self.id,
            old_value,
            new_value: self.value,
            content_type: self.content_type,
            file_path: self.file_path,
            line_hint: self.line_number,
            allow_multiple: self.allow_multiple,
            metadata: self.metadata,
        })
    }
}

/// A validated, immutable edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChange {
    pub id: String,
    pub old_value: String,
    pub new_value: String,
    pub locale: String,
    pub content_type: Option<EditableType>,
    pub file_path: Option<PathBuf>,
    pub line_hint: Option<usize>,
    pub allow_multiple: bool,
    pub metadata: BTreeMap<String, Value>,
}

/// A committed (or no-op) change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Applied {
    /// `None` when nothing was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<u64>,
    pub outcome: PatchOutcome,
}

/// Bulk submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkRequest {
    pub updates: Vec<UpdateItem>,
}

/// Outcome of one bulk item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub id: String,
    pub locale: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    pub index: usize,
    pub id: String,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkResponse {
    pub results: Vec<ItemResult>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ItemError>>,
}

/// Error body of the single update contract.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<&EditError> for ErrorBody {
    fn from(err: &EditError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Single update response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl From<&Result<Applied, EditError>> for UpdateResponse {
    fn from(result: &Result<Applied, EditError>) -> Self {
        match result {
            Ok(applied) => Self {
                success: true,
                history_id: applied.history_id,
                error: None,
            },
            Err(err) => Self {
                success: false,
                history_id: None,
                error: Some(err.into()),
            },
        }
    }
}
