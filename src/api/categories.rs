/// Category REST endpoints
///
/// GET/POST /api/categories and GET /api/category-mappings.

use crate::{api::AppState, error::CatalogError};
use axum::{
    extract::State,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Request body for category creation
#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub category: String,
    /// Accepted for client compatibility; not persisted
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddCategoryResponse {
    pub message: String,
    pub category: String,
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct CategoryMappingsResponse {
    pub mappings: BTreeMap<String, String>,
}

pub fn create_category_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(add_category))
        .route("/api/category-mappings", get(category_mappings))
}

/// List all categories
///
/// GET /api/categories
/// Returns: { "categories": ["...", "Uncategorized", ...] } sorted ascending
async fn list_categories(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "categories": state.catalog.list_categories() }))
}

/// Create a category
///
/// POST /api/categories
/// Body: { "category": "...", "description": "..." }
async fn add_category(
    State(state): State<AppState>,
    Json(payload): Json<AddCategoryRequest>,
) -> Result<Json<AddCategoryResponse>, CatalogError> {
    if let Some(description) = payload.description.as_deref().filter(|d| !d.is_empty()) {
        tracing::debug!("Ignoring description for category {}: {}", payload.category, description);
    }

    let outcome = state.catalog.add_category(&payload.category).await?;
    let message = if outcome.added {
        format!("Category '{}' created successfully", outcome.category)
    } else {
        format!("Category '{}' already exists", outcome.category)
    };

    Ok(Json(AddCategoryResponse {
        message,
        category: outcome.category,
        added: outcome.added,
    }))
}

/// Filename -> category mapping for client-side filtering
///
/// GET /api/category-mappings
async fn category_mappings(State(state): State<AppState>) -> Json<CategoryMappingsResponse> {
    Json(CategoryMappingsResponse {
        mappings: state.catalog.category_mappings(),
    })
}
