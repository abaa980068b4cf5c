//! Response DTOs for the cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the clear operation (DELETE /clear)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
}

impl ClearResponse {
    pub fn new(store_name: &str) -> Self {
        Self {
            message: format!("Store '{}' cleared", store_name),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Reads that found an expired entry
    pub expirations: u64,
    /// Failed storage operations
    pub storage_failures: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// End of the store lease in RFC 3339, when known
    pub store_expires_at: Option<String>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, store_expires_at_ms: Option<u64>) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            storage_failures: stats.storage_failures,
            hit_rate: stats.hit_rate(),
            store_expires_at: store_expires_at_ms.and_then(format_timestamp_ms),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Whether the cache store has been opened
    pub ready: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(ready: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            ready,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

fn format_timestamp_ms(ms: u64) -> Option<String> {
    let ms = i64::try_from(ms).ok()?;
    Utc.timestamp_millis_opt(ms).single().map(|t| t.to_rfc3339())
}
