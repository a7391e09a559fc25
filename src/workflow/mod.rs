/// Workflow Layer
///
/// Everything about individual workflow definitions:
/// - n8n definition and index record types
/// - Definition analysis (trigger, complexity, integrations, storage directory)
/// - SQLite index with an FTS5 shadow table
/// - Filesystem tree of per-service subdirectories
/// - Indexer keeping the two in sync
/// - Mermaid diagram rendering

// Definition and record types
pub mod types;

// Metadata derivation from definitions
pub mod analysis;

// SQLite persistence and full-text search
pub mod storage;

// Workflow file tree
pub mod files;

// Filesystem -> index pass
pub mod indexer;

// Mermaid flowcharts
pub mod diagram;

pub use types::{WorkflowDefinition, WorkflowNode, WorkflowRecord};
