//! Error types for the cache subsystem
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache tier.
///
/// Loader failures are not represented here: a fallback loader's error is the
/// caller's own type and is handed back untouched.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The durable store failed to read, write or delete
    #[error("Storage error: {0}")]
    Storage(String),

    /// A value or the metadata index could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A single entry can never fit within the byte budget
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Metadata references a blob that is missing or unreadable
    #[error("Corrupted entry: {0}")]
    Corrupted(String),

    /// Key is empty or too long
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Unknown named cache
    #[error("Cache not found: {0}")]
    CacheNotFound(String),

    /// Requested key is not cached
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) | CacheError::CacheNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidKey(_) | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::QuotaExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Corrupted(_) | CacheError::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;
