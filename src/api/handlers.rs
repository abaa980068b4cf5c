//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::storage::{FileEngine, StorageEngine};

/// Application state shared across all handlers.
///
/// The manager synchronizes its own state, so it is shared behind a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache manager
    pub cache: Arc<CacheManager>,
}

impl AppState {
    /// Creates a new AppState around the given cache manager.
    pub fn new(cache: CacheManager) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds a file-backed manager; the store is not opened until
    /// `CacheManager::initialize` runs.
    pub fn from_config(config: &Config) -> Self {
        let engine: Arc<dyn StorageEngine> = Arc::new(FileEngine::new(config.cache_dir.clone()));
        Self::new(CacheManager::new(engine, config.cache.clone()))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value in the cache with an optional entry lifetime.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state
        .cache
        .set_item(&req.key, &req.value, req.options())
        .await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key. Expired entries are reported as
/// not found.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value: Value = state
        .cache
        .get_item(&key)
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /clear
///
/// Removes every entry from the store; the store lease is kept.
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    state.cache.clear_cache().await?;

    Ok(Json(ClearResponse::new(&state.cache.config().store_name)))
}

/// Handler for GET /stats
///
/// Returns current cache statistics and the store lease end.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let expires_at = if state.cache.is_ready() {
        state.cache.store_expiration().await?
    } else {
        None
    };

    Ok(Json(StatsResponse::new(&state.cache.stats(), expires_at)))
}

/// Handler for GET /health
///
/// Returns health status and whether the cache store is ready.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.is_ready()))
}
