/// Health, statistics and maintenance endpoints

use crate::{
    api::{rate_limit::enforce_rate_limit, AppState},
    error::CatalogError,
    workflow::storage::CatalogStats,
};
use axum::{
    extract::{Query, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub struct ReindexParams {
    #[serde(default)]
    pub force: bool,
    pub admin_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub message: String,
    pub requested_by: String,
}

pub fn create_admin_routes(state: &AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/api/reindex", post(reindex))
        .route_layer(middleware::from_fn_with_state(state.clone(), enforce_rate_limit));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/stats", get(stats))
        .route("/api/integrations", get(integrations))
        .merge(limited)
}

/// GET /health
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Workflow catalog API is running",
    }))
}

/// GET /api/stats
async fn stats(State(state): State<AppState>) -> Result<Json<CatalogStats>, CatalogError> {
    Ok(Json(state.catalog.stats().await?))
}

/// Unique integration names across all indexed workflows
///
/// GET /api/integrations
async fn integrations(State(state): State<AppState>) -> Result<Json<Value>, CatalogError> {
    let integrations = state.catalog.integrations().await?;
    Ok(Json(json!({
        "count": integrations.len(),
        "integrations": integrations,
    })))
}

/// Trigger a background indexing pass
///
/// POST /api/reindex?force=true&admin_token=...
/// 503 when no admin token is configured, 401 when the supplied token does not match.
async fn reindex(
    State(state): State<AppState>,
    Query(params): Query<ReindexParams>,
) -> Result<Json<ReindexResponse>, CatalogError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(CatalogError::Disabled(
            "Reindexing is disabled: ADMIN_TOKEN is not configured".to_string(),
        ));
    };
    if params.admin_token.as_deref() != Some(expected) {
        tracing::warn!("🔒 Reindex rejected: invalid admin token");
        return Err(CatalogError::Unauthorized);
    }

    let catalog = state.catalog.clone();
    let force = params.force;
    tokio::spawn(async move {
        match catalog.reindex(force).await {
            Ok(stats) => tracing::info!("🔄 Background reindex finished: {:?}", stats),
            Err(e) => tracing::error!("❌ Background reindex failed: {}", e),
        }
    });

    tracing::info!("🔄 Reindex started (force={})", force);

    Ok(Json(ReindexResponse {
        message: if force {
            "Forced reindexing started in background".to_string()
        } else {
            "Reindexing started in background".to_string()
        },
        requested_by: "admin".to_string(),
    }))
}
