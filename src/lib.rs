/// Workflow catalog: searchable index and category bookkeeping for n8n workflow files
///
/// Workflow definitions live on disk under per-service subdirectories, are indexed into
/// SQLite with an FTS5 shadow table, and carry user-assigned categories persisted in
/// two JSON sidecar files.

// Core configuration and setup
pub mod config;

// Error kinds surfaced at the service boundary
pub mod error;

// Workflow definitions, analysis, storage, files and indexing
pub mod workflow;

// Category stores and the catalog service spanning every store
pub mod catalog;

// HTTP API layer - REST endpoints and rate limiting
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use catalog::WorkflowCatalog;
pub use error::{CatalogError, CatalogResult};
pub use server::{create_app, start_server};
