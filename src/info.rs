//! Connection info provider runtime object.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Serialize;

use crate::platform::{PlatformSession, SessionSupplier};
use crate::pool::{MetricsSnapshot, PoolMetricsRegistry};

/// Serializable view of a deployed pool's metadata.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConnectionInfo {
    /// Stable identity of the owning deployable.
    pub external_id: String,
    /// Host domain sessions are issued against.
    pub session_domain: String,
    /// Counters from the shared metric registry.
    pub metrics: MetricsSnapshot,
}

/// Read-only metadata object for a deployed connection pool.
///
/// Pure construction: no connections are opened and no lifecycle exists
/// beyond the owning deployment. The metric registry is the one shared by
/// every pool the module creates.
pub struct ConnectionInfoProvider {
    external_id: String,
    metrics: Arc<PoolMetricsRegistry>,
    session_supplier: SessionSupplier,
}

impl std::fmt::Debug for ConnectionInfoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionInfoProvider")
            .field("external_id", &self.external_id)
            .finish_non_exhaustive()
    }
}

impl ConnectionInfoProvider {
    pub fn new(
        external_id: String,
        metrics: Arc<PoolMetricsRegistry>,
        session_supplier: SessionSupplier,
    ) -> Self {
        Self {
            external_id,
            metrics,
            session_supplier,
        }
    }

    /// Stable identity of the owning deployable.
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// The metric registry shared across all pools of this module.
    pub fn metric_registry(&self) -> Arc<PoolMetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Obtain a fresh host platform session.
    pub fn session(&self) -> PlatformSession {
        (self.session_supplier)()
    }

    /// Take a serializable metadata snapshot.
    pub async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            external_id: self.external_id.clone(),
            session_domain: self.session().session_domain().to_string(),
            metrics: self.metrics.snapshot().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformContract, StaticPlatform};

    fn provider(metrics: Arc<PoolMetricsRegistry>) -> ConnectionInfoProvider {
        ConnectionInfoProvider::new(
            "edr2cc:my-db:hikari".to_string(),
            metrics,
            StaticPlatform::new("cortex").session_supplier(),
        )
    }

    #[tokio::test]
    async fn test_info_snapshot() {
        let metrics = Arc::new(PoolMetricsRegistry::new());
        metrics.record_created("edr2cc:my-db:hikari").await;

        let info = provider(Arc::clone(&metrics)).info().await;
        assert_eq!(info.external_id, "edr2cc:my-db:hikari");
        assert_eq!(info.session_domain, "cortex");
        assert_eq!(info.metrics.pools_created, 1);
    }

    #[test]
    fn test_shared_metric_registry() {
        let metrics = Arc::new(PoolMetricsRegistry::new());
        let first = provider(Arc::clone(&metrics));
        let second = provider(Arc::clone(&metrics));
        assert!(Arc::ptr_eq(
            &first.metric_registry(),
            &second.metric_registry()
        ));
    }

    #[tokio::test]
    async fn test_info_serialization() {
        let metrics = Arc::new(PoolMetricsRegistry::new());
        metrics.record_created("edr2cc:my-db:hikari").await;

        let info = provider(metrics).info().await;
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"external_id\":\"edr2cc:my-db:hikari\""));
        assert!(json.contains("\"session_domain\":\"cortex\""));
        assert!(json.contains("\"pools_created\":1"));
        assert!(json.contains("\"live_pools\":[\"edr2cc:my-db:hikari\"]"));
    }
}
