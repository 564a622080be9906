//! Expiry Sweep Task
//!
//! Background task that periodically sweeps expired entries out of every
//! registered cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::MultiLevelCache;

/// Shortest interval a sweep task will run at; smaller values are raised.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(100);

/// Named caches shared between the manager and its sweep task.
pub type Registry<V> = Arc<RwLock<HashMap<String, Arc<MultiLevelCache<V>>>>>;

// == Sweep Counters ==
/// Cumulative sweep figures, updated by every sweep.
#[derive(Debug, Default)]
pub struct SweepCounters {
    sweeps_run: AtomicU64,
    total_removed: AtomicU64,
}

/// Snapshot of [`SweepCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub sweeps_run: u64,
    pub total_removed: u64,
}

impl SweepCounters {
    pub fn snapshot(&self) -> SweepStats {
        SweepStats {
            sweeps_run: self.sweeps_run.load(Ordering::SeqCst),
            total_removed: self.total_removed.load(Ordering::SeqCst),
        }
    }

    fn record(&self, removed: usize) {
        self.sweeps_run.fetch_add(1, Ordering::SeqCst);
        self.total_removed.fetch_add(removed as u64, Ordering::SeqCst);
    }
}

// == Sweep ==
/// Runs `cleanup()` on every registered cache and returns the total removed.
///
/// A failure in one cache is logged and does not stop the others.
pub async fn sweep_caches<V>(caches: &Registry<V>, counters: &SweepCounters) -> usize
where
    V: Clone + Send + Sync + 'static,
{
    let snapshot: Vec<(String, Arc<MultiLevelCache<V>>)> = caches
        .read()
        .await
        .iter()
        .map(|(name, cache)| (name.clone(), cache.clone()))
        .collect();

    let mut removed = 0;
    for (name, cache) in snapshot {
        match cache.cleanup().await {
            Ok(count) => removed += count,
            Err(err) => error!(cache = %name, error = %err, "cleanup failed, continuing with other caches"),
        }
    }

    counters.record(removed);
    removed
}

/// Spawns a task that sweeps all caches every `interval`.
///
/// The task runs in an infinite loop, sleeping for the interval and then
/// calling [`sweep_caches`]. The first sweep happens one full interval after
/// spawning.
///
/// # Arguments
/// * `caches` - Registry shared with the owning manager
/// * `counters` - Counters updated by every sweep
/// * `interval` - Time between sweeps, raised to [`MIN_CLEANUP_INTERVAL`] if
///   shorter
///
/// # Returns
/// A JoinHandle that can be aborted to stop the task.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(registry, counters, Duration::from_secs(60));
/// // Later, to stop:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(
    caches: Registry<V>,
    counters: Arc<SweepCounters>,
    interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    if interval < MIN_CLEANUP_INTERVAL {
        warn!(
            requested_ms = interval.as_millis() as u64,
            "sweep interval too short, using {}ms",
            MIN_CLEANUP_INTERVAL.as_millis()
        );
    }
    let interval = interval.max(MIN_CLEANUP_INTERVAL);

    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = sweep_caches(&caches, &counters).await;

            if removed > 0 {
                info!("expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("expiry sweep: no expired entries found");
            }
        }
    })
}
