//! Deployment lifecycle management.
//!
//! The manager owns every deployed instance, keyed by external id. Deploying
//! runs all bound expert factories against a fresh instance scope; undeploying
//! destroys the scope, which runs the teardown hooks the factories registered.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::deploy::binding::{ComponentKind, DeployableBindingRegistry, DeployedExpert, ExpertContext};
use crate::deploy::scope::InstanceScope;
use crate::error::{DeployError, DeployResult};
use crate::model::{DatabaseType, Denotation, HikariCpConnectionPool};

/// Deployment information returned by list_deployments (no secrets exposed).
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeploymentSummary {
    /// Stable identity of the deployable.
    pub external_id: String,
    /// Human-readable deployable name, when enrichment filled it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Database type: "postgresql", "mysql", or "sqlite"
    pub db_type: DatabaseType,
    /// If true, the pool allows write operations.
    pub writable: bool,
    /// Database name from the connection URL, when one is targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Connection URL with credentials masked.
    pub masked_url: String,
    /// Per-deployment instance identifier.
    pub instance_id: String,
    /// RFC 3339 timestamp of when the instance was deployed.
    pub deployed_at: String,
    /// Component kinds produced for this deployment.
    pub components: Vec<ComponentKind>,
}

#[derive(Debug)]
struct DeploymentEntry {
    config: HikariCpConnectionPool,
    scope: Arc<InstanceScope>,
    experts: Vec<DeployedExpert>,
    instance_id: String,
    deployed_at: chrono::DateTime<chrono::Utc>,
}

impl DeploymentEntry {
    fn summary(&self, external_id: &str) -> DeploymentSummary {
        let descriptor = &self.config.connection_descriptor;
        DeploymentSummary {
            external_id: external_id.to_string(),
            name: self.config.name.clone(),
            db_type: descriptor.db_type,
            writable: descriptor.writable,
            database: descriptor.database.clone(),
            masked_url: descriptor.masked_connection_string(),
            instance_id: self.instance_id.clone(),
            deployed_at: self.deployed_at.to_rfc3339(),
            components: self.experts.iter().map(DeployedExpert::kind).collect(),
        }
    }
}

/// Owns deployed instances and drives their lifecycle.
#[derive(Clone)]
pub struct DeploymentManager {
    bindings: Arc<DeployableBindingRegistry>,
    deployments: Arc<RwLock<HashMap<String, DeploymentEntry>>>,
    shut_down: Arc<AtomicBool>,
}

impl std::fmt::Debug for DeploymentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentManager")
            .field("bindings", &self.bindings.binding_count())
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl DeploymentManager {
    /// Create a manager on top of a wired binding registry.
    pub fn new(bindings: Arc<DeployableBindingRegistry>) -> Self {
        Self {
            bindings,
            deployments: Arc::new(RwLock::new(HashMap::new())),
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Deploy an enriched pool deployable.
    ///
    /// Every factory bound for the deployable's type runs against one fresh
    /// instance scope. If any factory fails, the scope is destroyed so the
    /// teardown hooks of already-built experts run, and the error propagates.
    pub async fn deploy(
        &self,
        config: HikariCpConnectionPool,
    ) -> DeployResult<Vec<DeployedExpert>> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(DeployError::ShutDown);
        }

        let external_id = config.external_id.clone().ok_or_else(|| {
            DeployError::validation(
                "Pool deployable has no external id; identity enrichment must run before deployment",
            )
        })?;

        // Early check for an existing deployment
        {
            let deployments = self.deployments.read().await;
            if deployments.contains_key(&external_id) {
                return Err(DeployError::already_deployed(&external_id));
            }
        }

        let factories = self.bindings.factories_for(HikariCpConnectionPool::TYPE_TAG);
        if factories.is_empty() {
            return Err(DeployError::validation(format!(
                "No expert factories bound for type '{}'",
                HikariCpConnectionPool::TYPE_TAG
            )));
        }

        info!(
            external_id = %external_id,
            db_type = %config.connection_descriptor.db_type,
            components = factories.len(),
            "Deploying"
        );

        let scope = Arc::new(InstanceScope::new());
        let deployable = Arc::new(config.clone());
        let mut experts = Vec::with_capacity(factories.len());

        for (kind, factory) in factories {
            let ctx = ExpertContext::new(Arc::clone(&deployable), Arc::clone(&scope));
            match factory(ctx).await {
                Ok(expert) => experts.push(expert),
                Err(e) => {
                    warn!(
                        external_id = %external_id,
                        component = %kind,
                        error = %e,
                        "Expert factory failed, destroying scope"
                    );
                    scope.destroy().await;
                    return Err(e);
                }
            }
        }

        let entry = DeploymentEntry {
            config,
            scope: Arc::clone(&scope),
            experts: experts.clone(),
            instance_id: format!("deploy_{}", uuid::Uuid::new_v4().simple()),
            deployed_at: chrono::Utc::now(),
        };

        // Re-check after async work to prevent a concurrent deploy race.
        // If a duplicate won, destroy our fresh scope outside the lock.
        let lost_race = {
            let mut deployments = self.deployments.write().await;
            if deployments.contains_key(&external_id) {
                true
            } else {
                deployments.insert(external_id.clone(), entry);
                false
            }
        }; // Lock released here

        if lost_race {
            scope.destroy().await;
            return Err(DeployError::already_deployed(&external_id));
        }

        info!(external_id = %external_id, "Deployed successfully");
        Ok(experts)
    }

    /// Undeploy an instance and destroy its scope.
    pub async fn undeploy(&self, external_id: &str) -> DeployResult<()> {
        let entry = {
            let mut deployments = self.deployments.write().await;
            deployments
                .remove(external_id)
                .ok_or_else(|| DeployError::not_found(external_id))?
        }; // Lock released here

        info!(external_id = %external_id, "Undeploying");
        entry.scope.destroy().await;
        Ok(())
    }

    /// Check whether an instance is currently deployed.
    pub async fn deployed(&self, external_id: &str) -> bool {
        let deployments = self.deployments.read().await;
        deployments.contains_key(external_id)
    }

    /// Get the deployable configuration of a deployed instance.
    pub async fn get_config(&self, external_id: &str) -> DeployResult<HikariCpConnectionPool> {
        let deployments = self.deployments.read().await;
        match deployments.get(external_id) {
            Some(entry) => Ok(entry.config.clone()),
            None => Err(DeployError::not_found(external_id)),
        }
    }

    /// Get the experts produced for a deployed instance.
    pub async fn experts(&self, external_id: &str) -> DeployResult<Vec<DeployedExpert>> {
        let deployments = self.deployments.read().await;
        match deployments.get(external_id) {
            Some(entry) => Ok(entry.experts.clone()),
            None => Err(DeployError::not_found(external_id)),
        }
    }

    /// List all deployments with details.
    pub async fn list_deployments(&self) -> Vec<DeploymentSummary> {
        let deployments = self.deployments.read().await;
        deployments
            .iter()
            .map(|(external_id, entry)| entry.summary(external_id))
            .collect()
    }

    /// Get the number of active deployments.
    pub async fn deployment_count(&self) -> usize {
        let deployments = self.deployments.read().await;
        deployments.len()
    }

    /// Undeploy everything and refuse further deployments.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let drained: Vec<(String, DeploymentEntry)> = {
            let mut deployments = self.deployments.write().await;
            deployments.drain().collect()
        }; // Lock released here

        for (external_id, entry) in drained {
            info!(external_id = %external_id, "Undeploying on shutdown");
            entry.scope.destroy().await;
        }
        info!("All deployments undeployed");
    }
}
