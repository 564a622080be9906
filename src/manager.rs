//! Cache Manager
//!
//! Owns the named [`MultiLevelCache`] instances of an application and the
//! background expiry sweep. Construct one and pass it to whoever needs a
//! cache; there is no global instance.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{
    Clock, JsonSerializer, MemoryCache, MultiLevelCache, PersistentCache, Serializer, SystemClock,
    TierStats,
};
use crate::error::Result;
use crate::storage::DurableStore;
use crate::tasks::{spawn_cleanup_task, sweep_caches, Registry, SweepCounters, SweepStats};

// == Cache Options ==
/// Provisioning for one named cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    /// Durable namespace; the cache name is used when unset
    pub namespace: Option<String>,
    /// L1 entry capacity
    pub memory_capacity: usize,
    /// L1 default TTL
    pub memory_ttl: Option<Duration>,
    /// L2 byte budget
    pub disk_max_bytes: u64,
    /// L2 TTL for writes without an explicit TTL
    pub disk_ttl: Option<Duration>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            memory_capacity: 1000,
            memory_ttl: Some(Duration::from_secs(300)),
            disk_max_bytes: 50 * 1024 * 1024,
            disk_ttl: None,
        }
    }
}

// == Cache Manager ==
pub struct CacheManager<V = serde_json::Value> {
    store: Arc<dyn DurableStore>,
    serializer: Arc<dyn Serializer<V>>,
    clock: Arc<dyn Clock>,
    caches: Registry<V>,
    counters: Arc<SweepCounters>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> CacheManager<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a manager whose caches encode values as JSON.
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self::with_serializer(store, Arc::new(JsonSerializer::<V>::new()))
    }
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn with_serializer(store: Arc<dyn DurableStore>, serializer: Arc<dyn Serializer<V>>) -> Self {
        Self {
            store,
            serializer,
            clock: Arc::new(SystemClock),
            caches: Arc::new(RwLock::new(HashMap::new())),
            counters: Arc::new(SweepCounters::default()),
            sweeper: Mutex::new(None),
        }
    }

    /// Uses `clock` for every cache created afterwards.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // == Create Cache ==
    /// Builds and registers a cache under `name`.
    ///
    /// If `name` is already registered the existing instance is returned and
    /// `options` are ignored, so a namespace is never served by two instances.
    ///
    /// # Arguments
    /// * `name` - Registry name, also the durable namespace unless
    ///   `options.namespace` is set
    /// * `options` - Tier sizes and TTLs for a newly built cache
    ///
    /// # Returns
    /// * `Ok(cache)` - The new or already registered cache
    /// * `Err(CacheError::InvalidConfig)` - If the namespace contains
    ///   characters outside `[A-Za-z0-9_-]`
    ///
    /// # Example
    /// ```ignore
    /// let users = manager.create_cache("users", CacheOptions::default()).await?;
    /// users.set("u1", json!({"name": "ada"}), None).await?;
    /// ```
    pub async fn create_cache(&self, name: &str, options: CacheOptions) -> Result<Arc<MultiLevelCache<V>>> {
        let mut caches = self.caches.write().await;
        if let Some(existing) = caches.get(name) {
            debug!(cache = name, "cache already registered");
            return Ok(existing.clone());
        }

        let namespace = options.namespace.clone().unwrap_or_else(|| name.to_string());
        let l1 = MemoryCache::with_clock(options.memory_capacity, options.memory_ttl, self.clock.clone());
        let l2 = PersistentCache::new(
            namespace,
            options.disk_max_bytes,
            self.store.clone(),
            self.serializer.clone(),
        )?
        .with_clock(self.clock.clone());

        let cache = Arc::new(
            MultiLevelCache::new(name, l1, l2, self.serializer.clone(), self.clock.clone())
                .with_disk_ttl(options.disk_ttl),
        );
        caches.insert(name.to_string(), cache.clone());

        info!(
            cache = name,
            namespace = cache.disk().namespace(),
            memory_capacity = options.memory_capacity,
            disk_max_bytes = cache.disk().max_bytes(),
            "cache created"
        );
        Ok(cache)
    }

    // == Get Cache ==
    pub async fn get_cache(&self, name: &str) -> Option<Arc<MultiLevelCache<V>>> {
        self.caches.read().await.get(name).cloned()
    }

    /// Registered cache names, sorted.
    pub async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Unregisters a cache. Its stored entries are left in place.
    pub async fn remove_cache(&self, name: &str) -> Option<Arc<MultiLevelCache<V>>> {
        self.caches.write().await.remove(name)
    }

    // == Clear All ==
    /// Clears every cache. Returns the names of caches that failed to clear;
    /// a failure never stops the remaining caches from being cleared.
    pub async fn clear_all_caches(&self) -> Vec<String> {
        let snapshot: Vec<(String, Arc<MultiLevelCache<V>>)> = self
            .caches
            .read()
            .await
            .iter()
            .map(|(name, cache)| (name.clone(), cache.clone()))
            .collect();

        let mut failed = Vec::new();
        for (name, cache) in snapshot {
            if let Err(err) = cache.clear().await {
                warn!(cache = %name, error = %err, "failed to clear cache");
                failed.push(name);
            }
        }
        failed.sort();
        failed
    }

    // == Sweep ==
    /// Runs one expiry sweep now. Returns the number of entries removed.
    pub async fn sweep(&self) -> usize {
        sweep_caches(&self.caches, &self.counters).await
    }

    // == Auto Cleanup ==
    /// Starts sweeping every `interval`, replacing any running sweep task.
    ///
    /// Intervals shorter than [`MIN_CLEANUP_INTERVAL`](crate::tasks::MIN_CLEANUP_INTERVAL)
    /// are raised to it.
    pub fn start_auto_cleanup(&self, interval: Duration) {
        let handle = spawn_cleanup_task(self.caches.clone(), self.counters.clone(), interval);
        if let Some(previous) = self.sweeper_slot().replace(handle) {
            previous.abort();
            debug!("replaced running sweep task");
        }
    }

    /// Stops the sweep task. Does nothing if none is running.
    pub fn stop_auto_cleanup(&self) {
        if let Some(handle) = self.sweeper_slot().take() {
            handle.abort();
            info!("expiry sweep task stopped");
        }
    }

    pub fn is_auto_cleanup_running(&self) -> bool {
        self.sweeper_slot()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn sweep_stats(&self) -> SweepStats {
        self.counters.snapshot()
    }

    // == Stats ==
    /// Per-cache tier statistics. Caches whose durable tier cannot be read are
    /// left out.
    pub async fn get_all_stats(&self) -> BTreeMap<String, TierStats> {
        let snapshot: Vec<(String, Arc<MultiLevelCache<V>>)> = self
            .caches
            .read()
            .await
            .iter()
            .map(|(name, cache)| (name.clone(), cache.clone()))
            .collect();

        let mut all = BTreeMap::new();
        for (name, cache) in snapshot {
            match cache.stats().await {
                Ok(stats) => {
                    all.insert(name, stats);
                }
                Err(err) => warn!(cache = %name, error = %err, "stats unavailable"),
            }
        }
        all
    }

    fn sweeper_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sweeper.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V> Drop for CacheManager<V> {
    fn drop(&mut self) {
        let slot = self.sweeper.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
