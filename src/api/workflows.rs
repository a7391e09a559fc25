/// Workflow REST endpoints
///
/// Search, per-file access (detail, download, diagram), upload, category assignment
/// and cascade deletion. Per-file routes and upload sit behind the rate limiter.

use crate::{
    api::{rate_limit::enforce_rate_limit, AppState},
    catalog::types::{SearchPage, WorkflowDetail},
    error::CatalogError,
    workflow::storage::SearchQuery,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for category assignment
#[derive(Debug, Deserialize)]
pub struct AssignCategoryRequest {
    /// Optional echo of the path filename; must match when present
    #[serde(default)]
    pub filename: Option<String>,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct AssignCategoryResponse {
    pub message: String,
    pub filename: String,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteWorkflowResponse {
    pub message: String,
    pub filename: String,
    pub deleted_from_db: bool,
    pub deleted_from_filesystem: bool,
    pub removed_from_category_mappings: bool,
}

/// Query parameters accepted by the JSON upload endpoint
#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    /// Overrides the definition's `active` flag
    pub active: Option<bool>,
    /// Category to assign after indexing
    pub category: Option<String>,
    /// Preferred filename; sanitized when invalid
    pub filename: Option<String>,
}

/// Pagination for the per-category listing
#[derive(Debug, Deserialize)]
pub struct CategoryPageParams {
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn first_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub filepath: String,
    pub indexed: bool,
    pub category: String,
}

/// Create workflow routes
///
/// Routes:
/// - GET    /api/workflows                         - Search with filters and pagination
/// - GET    /api/workflows/category/{category}     - Workflows assigned to one category
/// - POST   /api/workflows/upload-json             - Store and index a workflow (limited)
/// - GET    /api/workflows/{filename}              - Metadata and raw JSON (limited)
/// - DELETE /api/workflows/{filename}              - Cascade delete (limited)
/// - GET    /api/workflows/{filename}/download     - Raw file (limited)
/// - GET    /api/workflows/{filename}/diagram      - Mermaid flowchart (limited)
/// - PUT    /api/workflows/{filename}/category     - Assign a category
pub fn create_workflow_routes(state: &AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/api/workflows/upload-json", post(upload_workflow))
        .route("/api/workflows/{filename}", get(get_workflow).delete(delete_workflow))
        .route("/api/workflows/{filename}/download", get(download_workflow))
        .route("/api/workflows/{filename}/diagram", get(workflow_diagram))
        .route_layer(middleware::from_fn_with_state(state.clone(), enforce_rate_limit));

    Router::new()
        .route("/api/workflows", get(search_workflows))
        .route("/api/workflows/category/{category}", get(workflows_in_category))
        .route("/api/workflows/{filename}/category", put(assign_category))
        .merge(limited)
}

/// Full-text search with filters
///
/// GET /api/workflows?q=&trigger=&complexity=&category=&active_only=&page=&per_page=
async fn search_workflows(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchPage>, CatalogError> {
    tracing::debug!("🔍 Searching workflows: {:?}", query);
    Ok(Json(state.catalog.search(query).await?))
}

/// GET /api/workflows/category/{category}?page=&per_page=
async fn workflows_in_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<CategoryPageParams>,
) -> Result<Json<SearchPage>, CatalogError> {
    Ok(Json(
        state
            .catalog
            .search_by_category(&category, params.page, params.per_page)
            .await?,
    ))
}

/// GET /api/workflows/{filename}
async fn get_workflow(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<WorkflowDetail>, CatalogError> {
    Ok(Json(state.catalog.get_workflow(&filename).await?))
}

/// GET /api/workflows/{filename}/download
async fn download_workflow(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, CatalogError> {
    let (filename, bytes) = state.catalog.download(&filename).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];
    Ok((headers, bytes))
}

/// GET /api/workflows/{filename}/diagram
async fn workflow_diagram(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, CatalogError> {
    let diagram = state.catalog.diagram(&filename).await?;
    Ok(Json(serde_json::json!({ "diagram": diagram })))
}

/// Assign a workflow to a category
///
/// PUT /api/workflows/{filename}/category
/// Body: { "filename": "...", "category": "..." }
async fn assign_category(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Json(payload): Json<AssignCategoryRequest>,
) -> Result<Json<AssignCategoryResponse>, CatalogError> {
    if let Some(body_filename) = payload.filename.as_deref() {
        if body_filename != filename {
            return Err(CatalogError::BadRequest(format!(
                "Body filename '{}' does not match path filename '{}'",
                body_filename, filename
            )));
        }
    }

    let outcome = state.catalog.assign(&filename, &payload.category).await?;
    Ok(Json(AssignCategoryResponse {
        message: format!("Category updated to '{}'", outcome.category),
        filename: outcome.filename,
        category: outcome.category,
    }))
}

/// Cascade delete
///
/// DELETE /api/workflows/{filename}
/// Partial outcomes are still 200; each flag reports its own store.
async fn delete_workflow(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteWorkflowResponse>, CatalogError> {
    let outcome = state.catalog.delete(&filename).await?;
    let message = if outcome.is_complete() {
        format!("Workflow '{}' deleted successfully", outcome.filename)
    } else {
        format!("Workflow '{}' partially deleted", outcome.filename)
    };

    Ok(Json(DeleteWorkflowResponse {
        message,
        filename: outcome.filename,
        deleted_from_db: outcome.deleted_from_db,
        deleted_from_filesystem: outcome.deleted_from_filesystem,
        removed_from_category_mappings: outcome.removed_from_mappings,
    }))
}

/// Upload a workflow definition as a JSON body
///
/// POST /api/workflows/upload-json?active=true&category=Sales&filename=my.json
async fn upload_workflow(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, CatalogError> {
    let data: Value = serde_json::from_slice(&body)
        .map_err(|e| CatalogError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    let outcome = state
        .catalog
        .upload(data, params.filename.as_deref(), params.active, params.category.as_deref())
        .await?;

    tracing::info!("📤 Uploaded workflow {} to {}", outcome.filename, outcome.filepath);

    Ok(Json(UploadResponse {
        message: format!("Workflow '{}' uploaded successfully", outcome.filename),
        filename: outcome.filename,
        filepath: outcome.filepath,
        indexed: outcome.indexed,
        category: outcome.category,
    }))
}
