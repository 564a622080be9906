//! Persistent Cache Module
//!
//! Second tier: values live as blobs in a [`DurableStore`], and a metadata
//! index stored next to them enforces the byte budget and TTLs.
//!
//! # Layout
//! - `{namespace}/{key}` holds the encoded value
//! - `{namespace}#index` holds the JSON metadata index
//!
//! The index is loaded once, lazily, and every read-modify-write of it runs
//! under a per-instance mutex so concurrent `set`/`delete` calls cannot lose
//! updates to `total_size`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::cache::stats::utilization_percent;
use crate::cache::{validate_key, Clock, DiskStats, Serializer, SystemClock};
use crate::error::{CacheError, Result};
use crate::storage::DurableStore;

// == Entry Metadata ==
/// Index record for one stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Encoded size in bytes
    pub size: u64,
    /// Write timestamp (Unix milliseconds)
    pub created: u64,
    /// Last read or write (Unix milliseconds)
    pub last_access: u64,
    /// Expiry timestamp, None = never
    pub expires: Option<u64>,
    /// TTL the entry was written with, in milliseconds
    pub ttl: Option<u64>,
}

impl EntryMeta {
    fn is_expired(&self, now_ms: u64) -> bool {
        self.expires.map(|expires| now_ms > expires).unwrap_or(false)
    }
}

// == Metadata Index ==
#[derive(Debug, Default, Serialize, Deserialize)]
struct MetadataIndex {
    entries: HashMap<String, EntryMeta>,
    total_size: u64,
    last_cleanup: Option<u64>,
}

impl MetadataIndex {
    fn insert(&mut self, key: String, meta: EntryMeta) {
        let size = meta.size;
        if let Some(old) = self.entries.insert(key, meta) {
            self.total_size = self.total_size.saturating_sub(old.size);
        }
        self.total_size += size;
    }

    fn remove(&mut self, key: &str) -> Option<EntryMeta> {
        let meta = self.entries.remove(key)?;
        self.total_size = self.total_size.saturating_sub(meta.size);
        Some(meta)
    }

    fn recompute_total(&mut self) {
        self.total_size = self.entries.values().map(|meta| meta.size).sum();
    }

    /// Keys ordered least recently accessed first, `protected` left out.
    fn eviction_order(&self, protected: &str) -> Vec<String> {
        let mut candidates: Vec<(&String, &EntryMeta)> = self
            .entries
            .iter()
            .filter(|(key, _)| key.as_str() != protected)
            .collect();
        candidates.sort_by(|(ka, a), (kb, b)| {
            (a.last_access, a.created, ka).cmp(&(b.last_access, b.created, kb))
        });
        candidates.into_iter().map(|(key, _)| key.clone()).collect()
    }
}

// == Persistent Cache ==
/// Durable, byte-budgeted cache tier.
pub struct PersistentCache<V> {
    namespace: String,
    max_bytes: u64,
    store: Arc<dyn DurableStore>,
    serializer: Arc<dyn Serializer<V>>,
    clock: Arc<dyn Clock>,
    index: OnceCell<Mutex<MetadataIndex>>,
}

impl<V> std::fmt::Debug for PersistentCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCache")
            .field("namespace", &self.namespace)
            .field("max_bytes", &self.max_bytes)
            .field("initialized", &self.index.initialized())
            .finish()
    }
}

impl<V> PersistentCache<V> {
    // == Constructor ==
    /// Creates a cache over `store`. Nothing is read until first use.
    ///
    /// The namespace may only contain ASCII alphanumerics, `-` and `_`, which
    /// keeps blob keys and the index key of different namespaces disjoint.
    pub fn new(
        namespace: impl Into<String>,
        max_bytes: u64,
        store: Arc<dyn DurableStore>,
        serializer: Arc<dyn Serializer<V>>,
    ) -> Result<Self> {
        let namespace = namespace.into();
        if namespace.is_empty()
            || !namespace
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(CacheError::InvalidConfig(format!(
                "namespace '{}' must be non-empty and use only [A-Za-z0-9_-]",
                namespace
            )));
        }

        Ok(Self {
            namespace,
            max_bytes,
            store,
            serializer,
            clock: Arc::new(SystemClock),
            index: OnceCell::new(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    // == Initialize ==
    /// Loads the metadata index, or starts an empty one if none is stored.
    ///
    /// Concurrent callers share a single in-flight load. A failed load leaves
    /// the cache uninitialized so the next caller retries.
    pub async fn initialize(&self) -> Result<()> {
        self.index().await.map(|_| ())
    }

    // == Get ==
    /// Reads a value. Every failure mode reads as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.get_with_meta(key).await.map(|(value, _)| value)
    }

    /// Reads a value together with its refreshed index record.
    pub async fn get_with_meta(&self, key: &str) -> Option<(V, EntryMeta)> {
        let index = match self.index().await {
            Ok(index) => index,
            Err(err) => {
                warn!(namespace = %self.namespace, error = %err, "index unavailable, treating read as miss");
                return None;
            }
        };
        let mut index = index.lock().await;
        let now = self.clock.now_ms();

        if index.entries.get(key)?.is_expired(now) {
            debug!(namespace = %self.namespace, key, "durable entry expired on read");
            if let Err(err) = self.discard(&mut index, key).await {
                warn!(namespace = %self.namespace, key, error = %err, "failed to drop expired entry");
            }
            return None;
        }

        let bytes = match self.store.get(&self.blob_key(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                let err = CacheError::Corrupted(format!("{}/{} has metadata but no blob", self.namespace, key));
                warn!(error = %err, "dropping stray metadata");
                index.remove(key);
                self.persist_logged(&index).await;
                return None;
            }
            Err(err) => {
                warn!(namespace = %self.namespace, key, error = %err, "durable read failed, treating as miss");
                return None;
            }
        };

        let value = match self.serializer.deserialize(&bytes) {
            Ok(value) => value,
            Err(err) => {
                warn!(namespace = %self.namespace, key, error = %err, "undecodable blob, dropping entry");
                if let Err(err) = self.discard(&mut index, key).await {
                    warn!(namespace = %self.namespace, key, error = %err, "failed to drop undecodable entry");
                }
                return None;
            }
        };

        let meta = index.entries.get_mut(key)?;
        meta.last_access = now;
        let meta = meta.clone();
        self.persist_logged(&index).await;

        Some((value, meta))
    }

    // == Set ==
    /// Writes a value and returns its encoded size.
    ///
    /// When the write would push the tier past its budget, least recently
    /// accessed entries are evicted first. If eviction cannot free enough
    /// (failed deletes), the budget is exceeded by at most this one entry.
    ///
    /// # Arguments
    /// * `key` - The key to store; never evicted to make room for itself
    /// * `value` - The value to encode and store
    /// * `ttl` - Optional TTL; `None` stores the entry without expiry
    ///
    /// # Returns
    /// * `Ok(size)` - Number of bytes written
    /// * `Err(CacheError::InvalidKey)` - If the key is empty or too long
    /// * `Err(CacheError::QuotaExceeded)` - If the entry alone is larger than the budget
    /// * `Err(CacheError::Storage)` - If the blob or index could not be written
    pub async fn set(&self, key: &str, value: &V, ttl: Option<Duration>) -> Result<u64> {
        validate_key(key)?;

        let bytes = self.serializer.serialize(value)?;
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(CacheError::QuotaExceeded(format!(
                "entry of {} bytes exceeds the {} byte budget of '{}'",
                size, self.max_bytes, self.namespace
            )));
        }

        let mut index = self.index().await?.lock().await;
        let now = self.clock.now_ms();

        let old_size = index.entries.get(key).map(|meta| meta.size).unwrap_or(0);
        let projected = index.total_size.saturating_sub(old_size) + size;
        let mut evicted = 0;
        if projected > self.max_bytes {
            evicted = self
                .evict_oldest(&mut index, key, projected - self.max_bytes)
                .await;
        }

        if let Err(err) = self.store.set(&self.blob_key(key), bytes).await {
            if evicted > 0 {
                self.persist_logged(&index).await;
            }
            return Err(err);
        }

        let ttl_ms = ttl.map(|ttl| ttl.as_millis() as u64);
        index.insert(
            key.to_string(),
            EntryMeta {
                size,
                created: now,
                last_access: now,
                expires: ttl_ms.map(|ttl| now.saturating_add(ttl)),
                ttl: ttl_ms,
            },
        );
        self.persist(&index).await?;

        Ok(size)
    }

    // == Delete ==
    /// Removes blob and metadata. Returns whether the key was indexed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut index = self.index().await?.lock().await;

        self.store.delete(&self.blob_key(key)).await?;
        let removed = index.remove(key).is_some();
        if removed {
            self.persist(&index).await?;
        }
        Ok(removed)
    }

    // == Has ==
    /// True if the key is indexed and unexpired. Does not read the blob.
    pub async fn has(&self, key: &str) -> bool {
        let Ok(index) = self.index().await else {
            return false;
        };
        let index = index.lock().await;
        let now = self.clock.now_ms();
        index
            .entries
            .get(key)
            .map(|meta| !meta.is_expired(now))
            .unwrap_or(false)
    }

    // == Cleanup ==
    /// Deletes every expired entry. Returns the number removed.
    pub async fn cleanup(&self) -> Result<usize> {
        let mut index = self.index().await?.lock().await;
        let now = self.clock.now_ms();

        let expired: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, meta)| meta.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            match self.store.delete(&self.blob_key(&key)).await {
                Ok(()) => {
                    index.remove(&key);
                    removed += 1;
                }
                Err(err) => {
                    warn!(namespace = %self.namespace, key, error = %err, "could not delete expired blob, keeping entry");
                }
            }
        }

        index.last_cleanup = Some(now);
        self.persist(&index).await?;

        if removed > 0 {
            info!(namespace = %self.namespace, removed, "durable tier cleanup removed expired entries");
        }
        Ok(removed)
    }

    // == Clear All ==
    /// Deletes every blob and index entry.
    ///
    /// Entries whose blob could not be deleted stay indexed, and the first
    /// such failure is returned after everything else is cleared.
    pub async fn clear_all(&self) -> Result<()> {
        let mut index = self.index().await?.lock().await;
        let keys: Vec<String> = index.entries.keys().cloned().collect();

        let mut first_err = None;
        for key in keys {
            match self.store.delete(&self.blob_key(&key)).await {
                Ok(()) => {
                    index.remove(&key);
                }
                Err(err) => {
                    warn!(namespace = %self.namespace, key, error = %err, "could not delete blob during clear");
                    first_err.get_or_insert(err);
                }
            }
        }
        index.recompute_total();
        self.persist(&index).await?;

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // == Stats ==
    pub async fn get_stats(&self) -> Result<DiskStats> {
        let index = self.index().await?.lock().await;
        Ok(DiskStats {
            entries: index.entries.len(),
            total_size: index.total_size,
            max_size: self.max_bytes,
            utilization_percent: utilization_percent(index.total_size, self.max_bytes),
            last_cleanup: index.last_cleanup,
        })
    }

    // == Internals ==
    async fn index(&self) -> Result<&Mutex<MetadataIndex>> {
        self.index.get_or_try_init(|| self.load_index()).await
    }

    async fn load_index(&self) -> Result<Mutex<MetadataIndex>> {
        let mut index = match self.store.get(&self.index_key()).await? {
            Some(bytes) => match serde_json::from_slice::<MetadataIndex>(&bytes) {
                Ok(index) => index,
                Err(err) => {
                    warn!(namespace = %self.namespace, error = %err, "metadata index unreadable, starting empty");
                    MetadataIndex::default()
                }
            },
            None => MetadataIndex::default(),
        };
        index.recompute_total();

        info!(
            namespace = %self.namespace,
            entries = index.entries.len(),
            total_size = index.total_size,
            "durable tier initialized"
        );
        Ok(Mutex::new(index))
    }

    /// Frees at least `required` bytes, least recently accessed first.
    /// Returns the number of entries evicted.
    async fn evict_oldest(&self, index: &mut MetadataIndex, protected: &str, required: u64) -> usize {
        let mut freed = 0;
        let mut evicted = 0;

        for key in index.eviction_order(protected) {
            if freed >= required {
                break;
            }
            if let Err(err) = self.store.delete(&self.blob_key(&key)).await {
                warn!(namespace = %self.namespace, key, error = %err, "eviction delete failed, skipping entry");
                continue;
            }
            if let Some(meta) = index.remove(&key) {
                freed += meta.size;
                evicted += 1;
                debug!(namespace = %self.namespace, key, size = meta.size, "durable tier evicted entry");
            }
        }

        if freed < required {
            warn!(
                namespace = %self.namespace,
                required,
                freed,
                "eviction could not free enough space, budget will be exceeded by the incoming entry"
            );
        }
        evicted
    }

    async fn discard(&self, index: &mut MetadataIndex, key: &str) -> Result<()> {
        self.store.delete(&self.blob_key(key)).await?;
        index.remove(key);
        self.persist(index).await
    }

    async fn persist(&self, index: &MetadataIndex) -> Result<()> {
        let bytes = serde_json::to_vec(index)?;
        self.store.set(&self.index_key(), bytes).await
    }

    async fn persist_logged(&self, index: &MetadataIndex) {
        if let Err(err) = self.persist(index).await {
            warn!(namespace = %self.namespace, error = %err, "failed to persist metadata index");
        }
    }

    fn blob_key(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }

    fn index_key(&self) -> String {
        format!("{}#index", self.namespace)
    }

    #[cfg(test)]
    pub(crate) async fn accounting(&self) -> (u64, u64, usize) {
        let index = self.index().await.expect("index").lock().await;
        let sum = index.entries.values().map(|meta| meta.size).sum();
        (index.total_size, sum, index.entries.len())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{JsonSerializer, ManualClock};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn cache_over(
        store: Arc<dyn DurableStore>,
        max_bytes: u64,
        clock: &ManualClock,
    ) -> PersistentCache<String> {
        PersistentCache::new("test", max_bytes, store, Arc::new(JsonSerializer::<String>::new()))
            .unwrap()
            .with_clock(Arc::new(clock.clone()))
    }

    /// JSON-encoded string of exactly `size` bytes (quotes included).
    fn value_of_size(size: usize) -> String {
        "x".repeat(size - 2)
    }

    /// Store whose writes and deletes can be switched off.
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
        fail_deletes: AtomicBool,
    }

    #[async_trait]
    impl DurableStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CacheError::Storage("disk full".into()));
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(CacheError::Storage("read-only".into()));
            }
            self.inner.delete(key).await
        }
    }

    /// Store that counts index reads and can fail the next one.
    #[derive(Debug, Default)]
    struct CountingStore {
        inner: MemoryStore,
        index_reads: AtomicUsize,
        fail_next_index_read: AtomicBool,
    }

    #[async_trait]
    impl DurableStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            if key.ends_with("#index") {
                self.index_reads.fetch_add(1, Ordering::SeqCst);
                // widen the window in which other callers pile up
                tokio::task::yield_now().await;
                if self.fail_next_index_read.swap(false, Ordering::SeqCst) {
                    return Err(CacheError::Storage("index unavailable".into()));
                }
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let clock = ManualClock::new(1_000);
        let cache = cache_over(Arc::new(MemoryStore::new()), 1_000, &clock);

        let size = cache.set("k", &"hello".to_string(), None).await.unwrap();

        assert_eq!(size, 7);
        assert_eq!(cache.get("k").await, Some("hello".to_string()));
        assert!(cache.has("k").await);
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn test_budget_eviction_scenario() {
        let clock = ManualClock::new(1_000);
        let cache = cache_over(Arc::new(MemoryStore::new()), 100, &clock);

        for key in ["k1", "k2", "k3"] {
            cache.set(key, &value_of_size(40), None).await.unwrap();
            clock.advance(Duration::from_millis(1));
        }

        assert!(!cache.has("k1").await);
        assert!(cache.has("k2").await);
        assert!(cache.has("k3").await);
        let stats = cache.get_stats().await.unwrap();
        assert_eq!(stats.total_size, 80);
        assert!(stats.total_size <= 100);
    }

    #[tokio::test]
    async fn test_read_refreshes_recency_for_eviction() {
        let clock = ManualClock::new(1_000);
        let cache = cache_over(Arc::new(MemoryStore::new()), 100, &clock);

        cache.set("k1", &value_of_size(40), None).await.unwrap();
        clock.advance(Duration::from_millis(1));
        cache.set("k2", &value_of_size(40), None).await.unwrap();
        clock.advance(Duration::from_millis(1));
        cache.get("k1").await.unwrap();
        clock.advance(Duration::from_millis(1));
        cache.set("k3", &value_of_size(40), None).await.unwrap();

        assert!(cache.has("k1").await);
        assert!(!cache.has("k2").await);
    }

    #[tokio::test]
    async fn test_overwrite_adjusts_total_size() {
        let clock = ManualClock::new(1_000);
        let cache = cache_over(Arc::new(MemoryStore::new()), 100, &clock);

        cache.set("k", &value_of_size(60), None).await.unwrap();
        cache.set("k", &value_of_size(90), None).await.unwrap();

        let (total, sum, entries) = cache.accounting().await;
        assert_eq!((total, sum, entries), (90, 90, 1));
    }

    #[tokio::test]
    async fn test_oversized_entry_rejected() {
        let clock = ManualClock::new(1_000);
        let cache = cache_over(Arc::new(MemoryStore::new()), 10, &clock);

        let result = cache.set("big", &value_of_size(11), None).await;
        assert!(matches!(result, Err(CacheError::QuotaExceeded(_))));
    }

    #[tokio::test]
    async fn test_ttl_expiry_on_read_removes_blob() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), 1_000, &clock);

        cache
            .set("k", &"v".to_string(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        clock.advance(Duration::from_millis(1_001));

        assert_eq!(cache.get("k").await, None);
        assert!(!store.contains("test/k").await);
        assert!(!cache.delete("k").await.unwrap());
        assert_eq!(cache.get_stats().await.unwrap().total_size, 0);
    }

    #[tokio::test]
    async fn test_missing_blob_self_heals() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), 1_000, &clock);

        cache.set("k", &"v".to_string(), None).await.unwrap();
        store.delete("test/k").await.unwrap();

        assert_eq!(cache.get("k").await, None);
        let (total, _, entries) = cache.accounting().await;
        assert_eq!((total, entries), (0, 0));
    }

    #[tokio::test]
    async fn test_undecodable_blob_is_a_miss() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), 1_000, &clock);

        cache.set("k", &"v".to_string(), None).await.unwrap();
        store.set("test/k", b"\xff\xfe".to_vec()).await.unwrap();

        assert_eq!(cache.get("k").await, None);
        assert!(!cache.has("k").await);
    }

    #[tokio::test]
    async fn test_index_survives_restart() {
        let clock = ManualClock::new(1_000);
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());

        {
            let cache = cache_over(store.clone(), 1_000, &clock);
            cache.set("a", &"one".to_string(), None).await.unwrap();
            cache.set("b", &"two".to_string(), None).await.unwrap();
        }

        let reopened = cache_over(store, 1_000, &clock);
        reopened.initialize().await.unwrap();
        assert_eq!(reopened.get("b").await, Some("two".to_string()));
        assert_eq!(reopened.get_stats().await.unwrap().entries, 2);
    }

    #[tokio::test]
    async fn test_corrupt_index_starts_empty() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(MemoryStore::new());
        store.set("test#index", b"garbage".to_vec()).await.unwrap();

        let cache = cache_over(store, 1_000, &clock);
        cache.initialize().await.unwrap();

        assert_eq!(cache.get_stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let clock = ManualClock::new(1_000);
        let cache = cache_over(Arc::new(MemoryStore::new()), 1_000, &clock);

        cache.set("short", &"v".to_string(), Some(Duration::from_secs(1))).await.unwrap();
        cache.set("long", &"v".to_string(), Some(Duration::from_secs(60))).await.unwrap();
        cache.set("forever", &"v".to_string(), None).await.unwrap();
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.cleanup().await.unwrap(), 1);
        let stats = cache.get_stats().await.unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.last_cleanup, Some(3_000));
    }

    #[tokio::test]
    async fn test_clear_all() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store.clone(), 1_000, &clock);

        cache.set("a", &"v".to_string(), None).await.unwrap();
        cache.set("b", &"v".to_string(), None).await.unwrap();
        cache.clear_all().await.unwrap();

        let stats = cache.get_stats().await.unwrap();
        assert_eq!((stats.entries, stats.total_size), (0, 0));
        assert!(!store.contains("test/a").await);
        // only the index document remains
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_write_surfaces_and_leaves_index_alone() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(FlakyStore::default());
        let cache = cache_over(store.clone(), 1_000, &clock);

        cache.set("a", &"v".to_string(), None).await.unwrap();
        store.fail_writes.store(true, Ordering::SeqCst);

        let result = cache.set("b", &"v".to_string(), None).await;
        assert!(matches!(result, Err(CacheError::Storage(_))));
        assert!(!cache.has("b").await);
        assert_eq!(cache.accounting().await.0, 3);
    }

    #[tokio::test]
    async fn test_failed_eviction_overshoots_by_one_entry_at_most() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(FlakyStore::default());
        let cache = cache_over(store.clone(), 100, &clock);

        cache.set("k1", &value_of_size(60), None).await.unwrap();
        store.fail_deletes.store(true, Ordering::SeqCst);
        cache.set("k2", &value_of_size(50), None).await.unwrap();

        let stats = cache.get_stats().await.unwrap();
        assert_eq!(stats.total_size, 110);
        assert!(stats.total_size <= 100 + 50);
        assert!(cache.has("k1").await);
    }

    #[tokio::test]
    async fn test_concurrent_initialize_and_writes() {
        let clock = ManualClock::new(1_000);
        let cache = Arc::new(cache_over(Arc::new(MemoryStore::new()), 10_000, &clock));

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.initialize().await.unwrap();
                cache.set(&format!("k{}", i), &"value".to_string(), None).await.unwrap();
                if i % 2 == 0 {
                    cache.delete(&format!("k{}", i)).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let (total, sum, entries) = cache.accounting().await;
        assert_eq!(total, sum);
        assert_eq!(entries, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_initialize_loads_index_once() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(cache_over(store.clone(), 10_000, &clock));

        let barrier = Arc::new(tokio::sync::Barrier::new(16));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                cache.initialize().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.index_reads.load(Ordering::SeqCst), 1);

        // later calls reuse the loaded index
        cache.initialize().await.unwrap();
        cache.get_stats().await.unwrap();
        assert_eq!(store.index_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_initialize_is_retried() {
        let clock = ManualClock::new(1_000);
        let store = Arc::new(CountingStore::default());
        store.fail_next_index_read.store(true, Ordering::SeqCst);
        let cache = cache_over(store.clone(), 10_000, &clock);

        assert!(cache.initialize().await.is_err());
        cache.initialize().await.unwrap();

        assert_eq!(store.index_reads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get_stats().await.unwrap().entries, 0);
    }

    #[test]
    fn test_namespace_validation() {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        let serializer = Arc::new(JsonSerializer::<String>::new());

        for bad in ["", "a/b", "a#b", "has space"] {
            let result = PersistentCache::new(bad, 10, store.clone(), serializer.clone());
            assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
        }
        assert!(PersistentCache::new("user-profiles_v2", 10, store, serializer).is_ok());
    }
}
