/// Catalog Layer
///
/// Category bookkeeping and the service that keeps the SQLite index, the workflow
/// file tree and the JSON sidecars in step:
/// - Category name set persisted as `unique_categories.json`
/// - Filename -> category assignments persisted as `search_categories.json`
/// - Filename guard shared by every per-file operation

// Category name set sidecar
pub mod categories;

// Filename validation and sanitizing
pub mod filename;

// Filename -> category assignment sidecar
pub mod mappings;

// Catalog operations across all stores
pub mod service;

// Atomic JSON sidecar IO
pub mod sidecar;

// Operation outcome records
pub mod types;

pub use categories::CategoryStore;
pub use mappings::CategoryMappings;
pub use service::WorkflowCatalog;
