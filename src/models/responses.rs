//! Response DTOs for the HTTP facade
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::cache::TierStats;
use crate::tasks::SweepStats;

/// Response body for `GET /caches/:name/keys/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub cache: String,
    pub key: String,
    pub value: Value,
}

/// Response body for write and delete operations
#[derive(Debug, Clone, Serialize)]
pub struct KeyResponse {
    /// Success message
    pub message: String,
    pub cache: String,
    pub key: String,
}

impl KeyResponse {
    pub fn stored(cache: &str, key: &str) -> Self {
        Self::new(cache, key, "stored")
    }

    pub fn deleted(cache: &str, key: &str) -> Self {
        Self::new(cache, key, "deleted")
    }

    fn new(cache: &str, key: &str, verb: &str) -> Self {
        Self {
            message: format!("Key '{}' {} in cache '{}'", key, verb, cache),
            cache: cache.to_string(),
            key: key.to_string(),
        }
    }
}

/// Response body for `POST /caches/:name/cleanup`
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub cache: String,
    pub removed: usize,
}

/// Response body for `DELETE /caches/:name`
#[derive(Debug, Clone, Serialize)]
pub struct RemoveResponse {
    pub message: String,
    pub cache: String,
    /// Durable namespace whose entries stay in the store
    pub namespace: String,
}

/// Response body for `DELETE /caches`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Caches that could not be cleared
    pub failed: Vec<String>,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub caches: BTreeMap<String, TierStats>,
    pub sweeps: SweepStats,
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Whether the expiry sweep is running
    pub auto_cleanup: bool,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(auto_cleanup: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            auto_cleanup,
        }
    }
}
