//! Data source factory.
//!
//! Owns the shared metric registry and turns enriched pool deployables into
//! live [`PooledConnectionSource`]s. One factory instance serves the whole
//! module, mirroring a process-wide pooling infrastructure singleton.

use std::sync::Arc;

use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::model::HikariCpConnectionPool;
use crate::pool::db_pool::DbPool;
use crate::pool::metrics::PoolMetricsRegistry;
use crate::pool::source::PooledConnectionSource;

#[derive(Debug, Default)]
pub struct DataSourceFactory {
    metrics: Arc<PoolMetricsRegistry>,
}

impl DataSourceFactory {
    /// Create a new factory with a fresh metric registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The metric registry shared by every pool this factory creates.
    pub fn metric_registry(&self) -> Arc<PoolMetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Build a live connection source from an enriched pool deployable.
    ///
    /// Establishment is fail-fast; an unreachable database surfaces here as a
    /// construction error rather than on first use.
    pub async fn data_source(
        &self,
        config: &HikariCpConnectionPool,
    ) -> DeployResult<PooledConnectionSource> {
        let external_id = config.external_id.clone().ok_or_else(|| {
            DeployError::validation(
                "Pool deployable has no external id; identity enrichment must run before deployment",
            )
        })?;

        let pool = DbPool::establish(&config.connection_descriptor).await?;
        self.metrics.record_created(&external_id).await;

        info!(
            external_id = %external_id,
            db_type = %pool.db_type(),
            url = %config.connection_descriptor.masked_connection_string(),
            "Created pooled connection source"
        );

        Ok(PooledConnectionSource::new(
            external_id,
            pool,
            Arc::clone(&self.metrics),
        ))
    }
}
