//! API Handlers
//!
//! HTTP request handlers mapping verbs onto the cache manager.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::MultiLevelCache;
use crate::error::{CacheError, Result};
use crate::manager::CacheManager;
use crate::models::{
    CleanupResponse, ClearResponse, GetResponse, HealthResponse, KeyResponse, RemoveResponse,
    SetRequest, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<CacheManager<Value>>,
}

impl AppState {
    pub fn new(manager: Arc<CacheManager<Value>>) -> Self {
        Self { manager }
    }

    async fn cache(&self, name: &str) -> Result<Arc<MultiLevelCache<Value>>> {
        self.manager
            .get_cache(name)
            .await
            .ok_or_else(|| CacheError::CacheNotFound(name.to_string()))
    }
}

/// Handler for PUT /caches/:name/keys/:key
pub async fn set_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<KeyResponse>> {
    let cache = state.cache(&name).await?;
    let ttl = req.ttl();
    cache.set(&key, req.value, ttl).await?;

    Ok(Json(KeyResponse::stored(&name, &key)))
}

/// Handler for GET /caches/:name/keys/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    let cache = state.cache(&name).await?;
    let value = cache
        .get(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse {
        cache: name,
        key,
        value,
    }))
}

/// Handler for DELETE /caches/:name/keys/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Json<KeyResponse>> {
    let cache = state.cache(&name).await?;
    if !cache.delete(&key).await? {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(KeyResponse::deleted(&name, &key)))
}

/// Handler for POST /caches/:name/cleanup
pub async fn cleanup_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CleanupResponse>> {
    let cache = state.cache(&name).await?;
    let removed = cache.cleanup().await?;

    Ok(Json(CleanupResponse {
        cache: name,
        removed,
    }))
}

/// Handler for GET /caches
pub async fn list_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.manager.cache_names().await)
}

/// Handler for DELETE /caches/:name
///
/// Unregisters the cache. Entries already written to the durable store stay
/// there and are picked up again if a cache with the same namespace is
/// created later.
pub async fn remove_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RemoveResponse>> {
    let cache = state
        .manager
        .remove_cache(&name)
        .await
        .ok_or_else(|| CacheError::CacheNotFound(name.clone()))?;

    Ok(Json(RemoveResponse {
        message: format!("Cache '{}' removed", name),
        namespace: cache.disk().namespace().to_string(),
        cache: name,
    }))
}

/// Handler for DELETE /caches
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let failed = state.manager.clear_all_caches().await;
    Json(ClearResponse { failed })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        caches: state.manager.get_all_stats().await,
        sweeps: state.manager.sweep_stats(),
    })
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.manager.is_auto_cleanup_running()))
}
