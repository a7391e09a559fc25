/// HTTP API Layer
///
/// REST endpoints for the workflow catalog:
/// - Category listing, creation and filename -> category mappings
/// - Workflow search, detail, download, diagram, upload, assignment and deletion
/// - Health, stats, integrations and admin reindexing

// Category endpoints
pub mod categories;

// Workflow endpoints
pub mod workflows;

// Health, stats and reindex
pub mod admin;

// Sliding window limiter for per-file and write endpoints
pub mod rate_limit;

use crate::catalog::service::WorkflowCatalog;
use axum::Router;
use rate_limit::RateLimiter;
use std::sync::Arc;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Catalog service over index, files and sidecars
    pub catalog: WorkflowCatalog,
    /// Shared limiter for guarded routes
    pub limiter: Arc<RateLimiter>,
    /// Token the reindex endpoint requires; `None` disables it
    pub admin_token: Option<String>,
}

/// Every API route, ready for `with_state`
pub fn create_api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(admin::create_admin_routes(state))
        .merge(categories::create_category_routes())
        .merge(workflows::create_workflow_routes(state))
}
