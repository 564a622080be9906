//! Background Tasks Module
//!
//! Contains background tasks that run periodically while caches are live.
//!
//! # Tasks
//! - Expiry sweep: removes expired durable entries from every named cache

mod cleanup;

pub use cleanup::{
    spawn_cleanup_task, sweep_caches, Registry, SweepCounters, SweepStats, MIN_CLEANUP_INTERVAL,
};
