//! Error types for the image relay

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use file_blob_cache::CacheError;
use github_content_store::StoreError;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum RelayError {
    BadRequest(String),
    Unauthorized,
    Cache(CacheError),
    /// The remote store could not produce the requested file
    RemoteFetch(StoreError),
    Upload(StoreError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            RelayError::Unauthorized => write!(f, "Unauthorized"),
            RelayError::Cache(err) => write!(f, "Cache error: {}", err),
            RelayError::RemoteFetch(err) => write!(f, "Remote fetch error: {}", err),
            RelayError::Upload(err) => write!(f, "Upload error: {}", err),
            RelayError::Io(err) => write!(f, "IO error: {}", err),
            RelayError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Cache(err) => Some(err),
            RelayError::RemoteFetch(err) | RelayError::Upload(err) => Some(err),
            RelayError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<CacheError> for RelayError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidKey(_) => RelayError::BadRequest("Invalid filename".to_string()),
            err => RelayError::Cache(err),
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for RelayError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        RelayError::Config(err.to_string())
    }
}

/// Only generic messages leave the process; details go to the log.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RelayError::RemoteFetch(_) => {
                (StatusCode::NOT_FOUND, "File not found".to_string())
            }
            RelayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            RelayError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            RelayError::Upload(err) => {
                tracing::error!(error = %err, "Upload to remote store failed");
                (StatusCode::BAD_GATEWAY, "Upload failed".to_string())
            }
            err => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
