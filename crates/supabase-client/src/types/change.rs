//! Realtime change payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SupabaseError;

/// Kind of row mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Event name used in subscription filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

/// A row change delivered by the realtime feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Mutation kind.
    #[serde(rename = "type")]
    pub kind: ChangeKind,

    /// Table the row belongs to.
    pub table: String,

    /// Database schema.
    #[serde(default)]
    pub schema: Option<String>,

    /// Row after the change (absent for deletes).
    #[serde(default)]
    pub record: Option<Value>,

    /// Row before the change, when the table publishes it.
    #[serde(default)]
    pub old_record: Option<Value>,
}

impl ChangeEvent {
    /// Decode the new row into a typed record.
    pub fn record<T: DeserializeOwned>(&self) -> Result<T, SupabaseError> {
        let record = self.record.clone().ok_or_else(|| {
            SupabaseError::UnexpectedResponse(format!(
                "{} event on {} has no record",
                self.kind.as_str(),
                self.table
            ))
        })?;
        Ok(serde_json::from_value(record)?)
    }
}
