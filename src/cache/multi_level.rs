//! Multi-Level Cache Module
//!
//! Composes the memory tier (L1) over the durable tier (L2). Reads fall
//! through L1 → L2 → optional loader and promote upward; writes go through to
//! both tiers before returning.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::{Clock, MemoryCache, PersistentCache, Serializer, TierStats};
use crate::error::Result;

// == Multi-Level Cache ==
/// Two-tier cache. Owns no entries itself.
///
/// Mutations, and L2 reads that may promote into L1, are serialized by a
/// per-cache write lock so the two tiers never end up holding different
/// values for the same key. Loaders run outside that lock.
pub struct MultiLevelCache<V> {
    name: String,
    l1: RwLock<MemoryCache<V>>,
    l2: PersistentCache<V>,
    serializer: Arc<dyn Serializer<V>>,
    clock: Arc<dyn Clock>,
    /// TTL given to L2 writes that carry no explicit TTL
    disk_ttl: Option<Duration>,
    writes: Mutex<()>,
}

impl<V> std::fmt::Debug for MultiLevelCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiLevelCache")
            .field("name", &self.name)
            .field("l2", &self.l2)
            .field("disk_ttl", &self.disk_ttl)
            .finish()
    }
}

impl<V> MultiLevelCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    pub fn new(
        name: impl Into<String>,
        l1: MemoryCache<V>,
        l2: PersistentCache<V>,
        serializer: Arc<dyn Serializer<V>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            l1: RwLock::new(l1),
            l2,
            serializer,
            clock,
            disk_ttl: None,
            writes: Mutex::new(()),
        }
    }

    /// Sets the TTL for L2 writes made without an explicit TTL.
    pub fn with_disk_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.disk_ttl = ttl;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Get ==
    /// Reads through L1 then L2. An L2 hit is promoted into L1 only.
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.l1.write().await.get(key) {
            debug!(cache = %self.name, key, "L1 hit");
            return Some(value);
        }

        let _guard = self.writes.lock().await;

        // a concurrent writer may have filled L1 while we waited
        if let Some(value) = self.l1.write().await.get(key) {
            return Some(value);
        }

        let (value, meta) = self.l2.get_with_meta(key).await?;
        debug!(cache = %self.name, key, "L2 hit, promoting");

        let mut l1 = self.l1.write().await;
        let now = self.clock.now_ms();
        let remaining = meta
            .expires
            .map(|expires| Duration::from_millis(expires.saturating_sub(now)));
        let ttl = match (l1.default_ttl(), remaining) {
            (Some(l1_ttl), Some(left)) => Some(l1_ttl.min(left)),
            (l1_ttl, left) => l1_ttl.or(left),
        };
        if let Err(err) = l1.insert(key.to_string(), value.clone(), ttl, meta.size as usize) {
            debug!(cache = %self.name, key, error = %err, "promotion skipped");
        }

        Some(value)
    }

    // == Get Or Load ==
    /// Like [`MultiLevelCache::get`], but a miss in both tiers calls `loader`.
    ///
    /// A loaded value is written through both tiers and returned; if caching
    /// it fails the failure is logged and the value is still returned. A
    /// loader error comes back exactly as the loader produced it, and nothing
    /// is cached.
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, ttl: Option<Duration>, loader: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        debug!(cache = %self.name, key, "miss in both tiers, running loader");
        let value = loader().await?;

        if let Err(err) = self.set(key, value.clone(), ttl).await {
            warn!(cache = %self.name, key, error = %err, "loaded value could not be cached");
        }
        Ok(value)
    }

    // == Set ==
    /// Writes through to L1 and L2.
    ///
    /// If either write fails, both tiers are cleared of the key and the error
    /// is returned: an absent entry is preferred over a half-written one.
    pub async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        let size = self.serializer.size_of(&value)?;
        let _guard = self.writes.lock().await;

        {
            let mut l1 = self.l1.write().await;
            let l1_ttl = ttl.or(l1.default_ttl());
            if let Err(err) = l1.insert(key.to_string(), value.clone(), l1_ttl, size) {
                l1.delete(key);
                drop(l1);
                self.discard_l2(key).await;
                return Err(err);
            }
        }

        if let Err(err) = self.l2.set(key, &value, ttl.or(self.disk_ttl)).await {
            warn!(cache = %self.name, key, error = %err, "L2 write failed, rolling back L1");
            self.l1.write().await.delete(key);
            self.discard_l2(key).await;
            return Err(err);
        }

        Ok(())
    }

    // == Delete ==
    /// Removes the key from both tiers. Returns whether either held it.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let _guard = self.writes.lock().await;
        let in_l1 = self.l1.write().await.delete(key);
        let in_l2 = self.l2.delete(key).await?;
        Ok(in_l1 || in_l2)
    }

    // == Has ==
    pub async fn has(&self, key: &str) -> bool {
        if self.l1.read().await.has(key) {
            return true;
        }
        self.l2.has(key).await
    }

    // == Clear ==
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.writes.lock().await;
        self.l1.write().await.clear();
        self.l2.clear_all().await
    }

    // == Cleanup ==
    /// Sweeps expired entries. Returns the number removed from L2.
    ///
    /// L1 expiry is lazy; its expired entries are dropped here too but not
    /// counted.
    pub async fn cleanup(&self) -> Result<usize> {
        let purged = self.l1.write().await.purge_expired();
        if purged > 0 {
            debug!(cache = %self.name, purged, "purged expired L1 entries");
        }
        self.l2.cleanup().await
    }

    // == Stats ==
    pub async fn stats(&self) -> Result<TierStats> {
        let memory = self.l1.read().await.get_stats();
        let disk = self.l2.get_stats().await?;
        Ok(TierStats { memory, disk })
    }

    /// Direct read access to the durable tier.
    pub fn disk(&self) -> &PersistentCache<V> {
        &self.l2
    }

    async fn discard_l2(&self, key: &str) {
        if let Err(err) = self.l2.delete(key).await {
            warn!(cache = %self.name, key, error = %err, "could not drop L2 copy after failed write");
        }
    }
}
