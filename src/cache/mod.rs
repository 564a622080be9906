//! Cache Module
//!
//! The two cache tiers and their composition:
//! - [`MemoryCache`]: bounded in-process LRU + TTL cache (L1)
//! - [`PersistentCache`]: byte-budgeted durable cache (L2)
//! - [`MultiLevelCache`]: read-through, write-through composition of both

mod clock;
mod entry;
mod lru;
mod memory;
mod multi_level;
mod persistent;
mod serializer;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use memory::MemoryCache;
pub use multi_level::MultiLevelCache;
pub use persistent::{EntryMeta, PersistentCache};
pub use serializer::{JsonSerializer, Serializer};
pub use stats::{DiskStats, MemoryStats, TierStats};

use crate::error::{CacheError, Result};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Rejects empty keys and keys longer than [`MAX_KEY_LENGTH`].
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
