/// Error kinds surfaced at the service boundary
///
/// Storage helpers return `anyhow::Result`; the catalog service and HTTP handlers
/// convert into `CatalogError`, which knows its HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid filename format: {0}")]
    InvalidFilename(String),

    #[error("Invalid category name: {0:?}")]
    InvalidCategory(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid authentication token")]
    Unauthorized,

    #[error("{0}")]
    Disabled(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::InvalidFilename(_) => StatusCode::BAD_REQUEST,
            CatalogError::InvalidCategory(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            CatalogError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CatalogError::Unauthorized => StatusCode::UNAUTHORIZED,
            CatalogError::Disabled(_) => StatusCode::SERVICE_UNAVAILABLE,
            CatalogError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            CatalogError::InvalidFilename(_) => "invalid_filename",
            CatalogError::InvalidCategory(_) => "invalid_category",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::RateLimited => "rate_limited",
            CatalogError::BadRequest(_) => "bad_request",
            CatalogError::Unauthorized => "unauthorized",
            CatalogError::Disabled(_) => "disabled",
            CatalogError::StorageFailure(_) => "storage_failure",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status_code: u16,
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
            status_code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        CatalogError::StorageFailure(format!("{:#}", err))
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::StorageFailure(format!("database error: {}", err))
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::StorageFailure(format!("filesystem error: {}", err))
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::StorageFailure(format!("serialization error: {}", err))
    }
}
