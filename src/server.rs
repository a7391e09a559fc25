/// Server setup and initialization
///
/// Wires together all components: sidecar stores, SQLite index, workflow file tree,
/// indexer, catalog service and HTTP routes.

use crate::{
    api::{create_api_routes, rate_limit::RateLimiter, AppState},
    catalog::{CategoryMappings, CategoryStore, WorkflowCatalog},
    config::Config,
    workflow::{files::WorkflowFiles, indexer::WorkflowIndexer, storage::WorkflowStorage},
};
use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main Axum application with all routes and middleware
///
/// Creates the storage directories, opens the index, loads both sidecars and runs one
/// incremental indexing pass before returning the router.
pub async fn create_app(config: Config) -> Result<Router> {
    let storage_config = &config.storage;

    tracing::info!("📁 Ensuring storage directories exist");
    for dir in [&storage_config.workflows_dir, &storage_config.context_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;
    }

    let storage = WorkflowStorage::connect(&storage_config.database_path).await?;
    let files = WorkflowFiles::new(storage_config.workflows_dir.clone());

    // Mappings load first so a missing category file can be seeded from them.
    tracing::info!("🏷️ Loading category sidecars from {}", storage_config.context_dir.display());
    let mappings = Arc::new(CategoryMappings::load(storage_config.mappings_file()).await?);
    let categories = Arc::new(CategoryStore::load(storage_config.categories_file(), mappings.categories()).await?);

    let indexer = Arc::new(WorkflowIndexer::new(
        storage.clone(),
        files.clone(),
        categories.clone(),
        mappings.clone(),
    ));

    tracing::info!("📥 Indexing workflows from {}", storage_config.workflows_dir.display());
    let stats = indexer
        .index_all(false)
        .await
        .context("Initial workflow indexing failed")?;
    tracing::info!(
        "📊 Startup index: {} processed, {} skipped, {} removed, {} errors",
        stats.processed,
        stats.skipped,
        stats.removed,
        stats.errors
    );

    let catalog = WorkflowCatalog::new(storage, files, categories, mappings, indexer);

    let state = AppState {
        catalog,
        limiter: Arc::new(RateLimiter::per_minute(config.security.max_requests_per_minute)),
        admin_token: config.security.admin_token.clone(),
    };
    if state.admin_token.is_none() {
        tracing::warn!("🔒 ADMIN_TOKEN not set, reindex endpoint disabled");
    }

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = create_api_routes(&state)
        .with_state(state)
        .layer(cors_layer(&config.security.allowed_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Start the HTTP server with the given configuration
///
/// Creates the application and serves it on the configured address until Ctrl+C.
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting workflow catalog server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on http://{}", bind_addr);

    // Connect info gives the rate limiter a per-client key.
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
    }
}
