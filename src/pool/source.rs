//! Pooled connection source runtime object.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, info};

use crate::model::DatabaseType;
use crate::pool::db_pool::DbPool;
use crate::pool::metrics::PoolMetricsRegistry;

/// Point-in-time view of a connection source (no secrets exposed).
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SourceStatus {
    /// Stable identity of the owning deployable.
    pub external_id: String,
    /// Database type: "postgresql", "mysql", or "sqlite"
    pub db_type: DatabaseType,
    /// Whether the source has been closed.
    pub closed: bool,
    /// Connections currently held by the underlying pool.
    pub pool_size: u32,
}

/// Live runtime object owning a database connection pool.
///
/// Lifetime is scoped by the deployment that produced it: the owning scope's
/// teardown closes the source, and closing is idempotent so the pool shuts
/// down exactly once no matter how teardown and explicit closes interleave.
#[derive(Debug)]
pub struct PooledConnectionSource {
    external_id: String,
    pool: DbPool,
    metrics: Arc<PoolMetricsRegistry>,
    closed: AtomicBool,
}

impl PooledConnectionSource {
    pub(crate) fn new(
        external_id: String,
        pool: DbPool,
        metrics: Arc<PoolMetricsRegistry>,
    ) -> Self {
        Self {
            external_id,
            pool,
            metrics,
            closed: AtomicBool::new(false),
        }
    }

    /// Stable identity of the owning deployable.
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Database type of the underlying pool.
    pub fn db_type(&self) -> DatabaseType {
        self.pool.db_type()
    }

    /// Access the underlying pool.
    ///
    /// Returns `None` once the source has been closed.
    pub fn pool(&self) -> Option<&DbPool> {
        if self.is_closed() {
            None
        } else {
            Some(&self.pool)
        }
    }

    /// Check whether the source has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the underlying pool. Idempotent; only the first call closes.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!(external_id = %self.external_id, "Connection source already closed");
            return;
        }
        info!(external_id = %self.external_id, "Closing pooled connection source");
        self.pool.close().await;
        self.metrics.record_closed(&self.external_id).await;
    }

    /// Take a point-in-time status snapshot.
    pub fn status(&self) -> SourceStatus {
        SourceStatus {
            external_id: self.external_id.clone(),
            db_type: self.pool.db_type(),
            closed: self.is_closed(),
            pool_size: self.pool.size(),
        }
    }
}
