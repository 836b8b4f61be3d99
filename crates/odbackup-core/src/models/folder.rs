use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Child of the backup folder; one per day of backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolderEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "createdDateTime")]
    pub created_date_time: DateTime<Utc>,
    /// Present (possibly empty) when the item is a folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<serde_json::Value>,
}

impl RemoteFolderEntry {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

/// Result of an ensure-exists call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

/// A retention deletion that did not go through.
#[derive(Debug, Clone, Serialize)]
pub struct PruneFailure {
    pub id: String,
    pub name: String,
    pub error: String,
}

/// Per-item outcome of a retention pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    /// Names of entries that were deleted.
    pub deleted: Vec<String>,
    /// Number of entries younger than the cutoff.
    pub retained: usize,
    pub failures: Vec<PruneFailure>,
}

impl PruneReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
