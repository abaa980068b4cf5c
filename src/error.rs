//! Error types for the lease cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache and its storage engines.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A cache operation was issued before initialization completed
    #[error("No instance of the cache store exists yet; call initialize first")]
    NotInitialized,

    /// Caller key collides with the internal bookkeeping namespace
    #[error("Key is reserved for internal use: {0}")]
    ReservedKey(String),

    /// Key not found, or found expired, by the HTTP API
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The underlying storage engine failed
    #[error("Storage failure: {0}")]
    Storage(String),

    /// A value or stored envelope could not be (de)serialized
    #[error("Serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
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
            CacheError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::ReservedKey(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the lease cache.
pub type Result<T> = std::result::Result<T, CacheError>;
