/// Configuration management for the workflow catalog
///
/// Handles server binding, storage locations (workflow tree, sidecar files, SQLite index)
/// and request security settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage locations
    pub storage: StorageConfig,
    /// Rate limiting, admin token and CORS
    pub security: SecurityConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "127.0.0.1")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Where catalog state lives on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the workflow tree; files sit one level down in per-service subdirectories
    pub workflows_dir: PathBuf,
    /// Directory holding the JSON sidecars (unique_categories.json, search_categories.json)
    pub context_dir: PathBuf,
    /// SQLite database file with the `workflows` table and its FTS shadow
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Requests allowed per client within a sliding 60 second window
    pub max_requests_per_minute: usize,
    /// Token required by the reindex endpoint; the endpoint is disabled when unset
    pub admin_token: Option<String>,
    /// Origins accepted by the CORS layer
    pub allowed_origins: Vec<String>,
}

impl StorageConfig {
    /// Category name set sidecar
    pub fn categories_file(&self) -> PathBuf {
        self.context_dir.join("unique_categories.json")
    }

    /// Filename -> category assignment sidecar
    pub fn mappings_file(&self) -> PathBuf {
        self.context_dir.join("search_categories.json")
    }
}

impl Config {
    /// Configuration rooted at a single base directory, used by tests and embedding callers
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let mut config = Self::default();
        config.storage = StorageConfig {
            workflows_dir: base.join("workflows"),
            context_dir: base.join("context"),
            database_path: base.join("database").join("workflows.db"),
        };
        config
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("CATALOG_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("CATALOG_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .unwrap_or(8000),
            },
            storage: StorageConfig {
                workflows_dir: std::env::var("CATALOG_WORKFLOWS_DIR")
                    .unwrap_or_else(|_| "workflows".to_string())
                    .into(),
                context_dir: std::env::var("CATALOG_CONTEXT_DIR")
                    .unwrap_or_else(|_| "context".to_string())
                    .into(),
                database_path: std::env::var("CATALOG_DATABASE_PATH")
                    .unwrap_or_else(|_| "database/workflows.db".to_string())
                    .into(),
            },
            security: SecurityConfig {
                max_requests_per_minute: std::env::var("CATALOG_RATE_LIMIT_PER_MINUTE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
                admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
                allowed_origins: std::env::var("CATALOG_ALLOWED_ORIGINS")
                    .map(|v| {
                        v.split(',')
                            .map(|o| o.trim().to_string())
                            .filter(|o| !o.is_empty())
                            .collect()
                    })
                    .unwrap_or_else(|_| {
                        vec![
                            "http://localhost:3000".to_string(),
                            "http://localhost:8000".to_string(),
                            "http://localhost:8080".to_string(),
                        ]
                    }),
            },
        }
    }
}
