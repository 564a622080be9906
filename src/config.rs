//! Configuration Module
//!
//! Loads server settings and named-cache provisioning from environment
//! variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::manager::CacheOptions;

/// Server and cache configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Directory for the file store; None keeps blobs in memory
    pub cache_dir: Option<PathBuf>,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Options applied to every named cache unless overridden
    pub defaults: CacheOptions,
    /// Named caches to create at startup
    pub caches: Vec<(String, CacheOptions)>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DIR` - File store directory (default: unset, in-memory store)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `MEMORY_CAPACITY` - L1 entries per cache (default: 1000)
    /// - `MEMORY_TTL` - L1 TTL in seconds (default: 300)
    /// - `DISK_MAX_BYTES` - L2 byte budget per cache (default: 50 MiB)
    /// - `DISK_TTL` - L2 TTL in seconds (default: unset, no expiry)
    /// - `CACHES` - Comma-separated cache names, each optionally
    ///   `name=capacity/ttl_secs/max_bytes` (default: `default`)
    pub fn from_env() -> Result<Self> {
        let base = Self::default();

        let defaults = CacheOptions {
            namespace: None,
            memory_capacity: env_parse("MEMORY_CAPACITY").unwrap_or(base.defaults.memory_capacity),
            memory_ttl: env_parse("MEMORY_TTL")
                .map(Duration::from_secs)
                .or(base.defaults.memory_ttl),
            disk_max_bytes: env_parse("DISK_MAX_BYTES").unwrap_or(base.defaults.disk_max_bytes),
            disk_ttl: env_parse("DISK_TTL").map(Duration::from_secs),
        };

        let caches = match env::var("CACHES") {
            Ok(list) => parse_cache_list(&list, &defaults)?,
            Err(_) => vec![("default".to_string(), defaults.clone())],
        };

        Ok(Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(base.server_port),
            cache_dir: env::var("CACHE_DIR").ok().filter(|v| !v.is_empty()).map(PathBuf::from),
            cleanup_interval: env_parse("CLEANUP_INTERVAL").unwrap_or(base.cleanup_interval),
            defaults,
            caches,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = CacheOptions::default();
        Self {
            server_port: 3000,
            cache_dir: None,
            cleanup_interval: 60,
            caches: vec![("default".to_string(), defaults.clone())],
            defaults,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Parses `name[=capacity/ttl_secs/max_bytes],...`.
pub fn parse_cache_list(list: &str, defaults: &CacheOptions) -> Result<Vec<(String, CacheOptions)>> {
    let mut caches = Vec::new();

    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, options) = match item.split_once('=') {
            None => (item, defaults.clone()),
            Some((name, triple)) => {
                let parts: Vec<&str> = triple.split('/').map(str::trim).collect();
                let [capacity, ttl, max_bytes] = parts.as_slice() else {
                    return Err(CacheError::InvalidConfig(format!(
                        "cache '{}' expects capacity/ttl_secs/max_bytes, got '{}'",
                        name, triple
                    )));
                };
                let options = CacheOptions {
                    memory_capacity: parse_field(name, "capacity", capacity)?,
                    memory_ttl: Some(Duration::from_secs(parse_field(name, "ttl_secs", ttl)?)),
                    disk_max_bytes: parse_field(name, "max_bytes", max_bytes)?,
                    ..defaults.clone()
                };
                (name.trim(), options)
            }
        };
        caches.push((name.to_string(), options));
    }

    if caches.is_empty() {
        return Err(CacheError::InvalidConfig("CACHES names no caches".to_string()));
    }
    Ok(caches)
}

fn parse_field<T: std::str::FromStr>(cache: &str, field: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        CacheError::InvalidConfig(format!("cache '{}': invalid {} '{}'", cache, field, raw))
    })
}
