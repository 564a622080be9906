//! Tiered Cache - two-tier caching with named cache management
//!
//! An LRU + TTL memory tier over a byte-budgeted durable tier, composed into
//! read-through/write-through caches that a [`CacheManager`] owns and sweeps.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{MemoryCache, MultiLevelCache, PersistentCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use manager::{CacheManager, CacheOptions};
pub use storage::{DurableStore, FileStore, MemoryStore};
