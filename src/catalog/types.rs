/// Result records returned by catalog operations
///
/// Multi-store operations report each store separately; nothing here collapses a
/// partial outcome into a single success flag.

use crate::workflow::types::WorkflowRecord;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryAddOutcome {
    pub category: String,
    /// False when the name already existed
    pub added: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssignmentOutcome {
    pub filename: String,
    pub category: String,
    /// The category did not exist before this assignment
    pub category_created: bool,
}

/// Per-store result of a cascade delete
///
/// Steps run independently; any combination of flags is a legitimate outcome.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeletionOutcome {
    pub filename: String,
    /// Relational row (and with it the search index entry) removed
    pub deleted_from_db: bool,
    /// File removed from its subdirectory
    pub deleted_from_filesystem: bool,
    /// The assignment sidecar no longer holds an entry for the file
    pub removed_from_mappings: bool,
}

impl DeletionOutcome {
    pub fn is_complete(&self) -> bool {
        self.deleted_from_db && self.deleted_from_filesystem && self.removed_from_mappings
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDetail {
    pub metadata: WorkflowRecord,
    pub raw_json: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub workflows: Vec<WorkflowRecord>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
    pub query: String,
    pub filters: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    pub filepath: String,
    pub indexed: bool,
    pub category: String,
}
