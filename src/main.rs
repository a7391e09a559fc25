/// Workflow catalog server entry point
///
/// Loads configuration from the environment, applies command-line overrides and starts
/// the HTTP server.

use clap::Parser;
use workflow_catalog::{config::Config, server::start_server};

#[derive(Debug, Parser)]
#[command(name = "workflow-catalog", version, about = "Workflow catalog API server")]
struct Cli {
    /// Bind address (overrides CATALOG_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port (overrides CATALOG_PORT)
    #[arg(long)]
    port: Option<u16>,
}

/// Application entry point
///
/// The server provides:
/// - Workflow search, detail, upload and deletion at /api/workflows/*
/// - Category management at /api/categories and /api/category-mappings
/// - Health check at /health
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::default();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    start_server(config).await
}
