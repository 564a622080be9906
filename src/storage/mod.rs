//! Durable Storage Module
//!
//! The byte-oriented key-value collaborator that backs the durable tier.
//! Only point reads, writes and deletes are required; no listing.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use file::FileStore;
pub use memory::MemoryStore;

// == Durable Store Trait ==
/// Opaque durable key-value store.
#[async_trait]
pub trait DurableStore: Send + Sync + std::fmt::Debug {
    /// Reads the bytes under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous bytes.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
