//! Shared pool metric registry.
//!
//! One registry instance exists per [`DataSourceFactory`](crate::pool::DataSourceFactory)
//! and is handed out to every connection info provider, so all pools created
//! by the module report into the same place.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Point-in-time view of the registry counters.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MetricsSnapshot {
    /// Total pools established since process start.
    pub pools_created: u64,
    /// Total pools closed since process start.
    pub pools_closed: u64,
    /// External ids of pools currently live, sorted.
    pub live_pools: Vec<String>,
}

/// Process-wide registry of pool lifecycle counters, keyed by external id.
#[derive(Debug, Default)]
pub struct PoolMetricsRegistry {
    pools_created: AtomicU64,
    pools_closed: AtomicU64,
    live: RwLock<HashSet<String>>,
}

impl PoolMetricsRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly established pool.
    pub async fn record_created(&self, external_id: &str) {
        let mut live = self.live.write().await;
        if !live.insert(external_id.to_string()) {
            warn!(external_id = %external_id, "Pool recorded as created twice");
        }
        self.pools_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed pool. Repeated calls for the same id are ignored.
    pub async fn record_closed(&self, external_id: &str) {
        let mut live = self.live.write().await;
        if live.remove(external_id) {
            self.pools_closed.fetch_add(1, Ordering::Relaxed);
        } else {
            debug!(external_id = %external_id, "Close already recorded for pool");
        }
    }

    /// Total pools established since process start.
    pub fn pools_created(&self) -> u64 {
        self.pools_created.load(Ordering::Relaxed)
    }

    /// Total pools closed since process start.
    pub fn pools_closed(&self) -> u64 {
        self.pools_closed.load(Ordering::Relaxed)
    }

    /// Number of pools currently live.
    pub async fn live_count(&self) -> usize {
        self.live.read().await.len()
    }

    /// External ids of pools currently live, sorted for stable output.
    pub async fn live_pool_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.live.read().await.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Take a point-in-time snapshot of all counters.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pools_created: self.pools_created(),
            pools_closed: self.pools_closed(),
            live_pools: self.live_pool_ids().await,
        }
    }
}
