//! Module wiring for the Hikari pool binding.
//!
//! [`HikariPoolModule`] owns the platform contract and the data-source
//! factory, registers the descriptor morpher and the identity enricher with
//! the transformer registry, and binds the two expert factories (pooled
//! connection source, connection info provider) into the binding registry.
//! [`bootstrap`] wires everything into a ready-to-use runtime.

use std::sync::Arc;

use tracing::debug;

use crate::deploy::{
    ComponentKind, DeployableBindingRegistry, DeployedExpert, DeploymentManager, ExpertContext,
};
use crate::error::DeployError;
use crate::info::ConnectionInfoProvider;
use crate::model::{DatabaseConnectionDescriptor, HikariCpConnectionPool};
use crate::platform::PlatformContract;
use crate::pool::DataSourceFactory;
use crate::transform::{DenotationTransformerRegistry, EnrichmentResult, TransformationContext};

/// Registration name of the identity enricher.
pub const IDENTITY_ENRICHER: &str = "HikariCpPoolEnricher";

const NAME_SUFFIX: &str = " Hikari Connection Pool";
const EXTERNAL_ID_PREFIX: &str = "edr2cc:";
const EXTERNAL_ID_SUFFIX: &str = ":hikari";

/// Title-case a hyphen-delimited identifier: segments capitalized and joined
/// by spaces. Empty segments (doubled hyphens) are skipped.
fn title_case(identifier: &str) -> String {
    identifier
        .split('-')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fill the identity fields of a pool deployable from the denotation id.
///
/// Each of name, external id, and global id is filled only when unset, in
/// that order; the global id mirrors the external id, whether pre-set or
/// just computed. Without a denotation id there is nothing to derive, now
/// or on any later call.
fn enrich_pool_identity(
    ctx: &TransformationContext,
    config: &mut HikariCpConnectionPool,
) -> EnrichmentResult {
    let Some(id) = ctx.denotation_id() else {
        return EnrichmentResult::NothingNowOrEver;
    };

    let mut changes = Vec::new();

    if config.name.is_none() {
        let name = format!("{}{}", title_case(id), NAME_SUFFIX);
        changes.push(format!("name to [{name}]"));
        config.name = Some(name);
    }
    if config.external_id.is_none() {
        let external_id = format!("{EXTERNAL_ID_PREFIX}{id}{EXTERNAL_ID_SUFFIX}");
        changes.push(format!("external id to [{external_id}]"));
        config.external_id = Some(external_id);
    }
    if config.global_id.is_none() {
        if let Some(external_id) = &config.external_id {
            changes.push(format!("global id to [{external_id}]"));
            config.global_id = Some(external_id.clone());
        }
    }

    if changes.is_empty() {
        return EnrichmentResult::NothingNowOrEver;
    }
    EnrichmentResult::all_done(format!("Configured {}", changes.join(" and ")))
}

/// Binding module for Hikari-backed connection pools.
///
/// Construction takes the platform contract explicitly; everything else the
/// module needs it builds itself.
pub struct HikariPoolModule {
    platform: Arc<dyn PlatformContract>,
    data_sources: Arc<DataSourceFactory>,
}

impl std::fmt::Debug for HikariPoolModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HikariPoolModule").finish_non_exhaustive()
    }
}

impl HikariPoolModule {
    /// Create the module against a platform contract.
    pub fn new(platform: Arc<dyn PlatformContract>) -> Self {
        Self {
            platform,
            data_sources: Arc::new(DataSourceFactory::new()),
        }
    }

    /// The factory producing pooled connection sources, shared with every
    /// expert this module binds.
    pub fn data_sources(&self) -> &Arc<DataSourceFactory> {
        &self.data_sources
    }

    /// Register the descriptor morpher and the identity enricher.
    pub fn bind_transformers(&self, registry: &mut DenotationTransformerRegistry) {
        registry.register_standard_morpher(|_ctx, descriptor: DatabaseConnectionDescriptor| {
            HikariCpConnectionPool::from_descriptor(descriptor)
        });
        registry.register_enricher(IDENTITY_ENRICHER, enrich_pool_identity);
        debug!("Registered pool transformers");
    }

    /// Bind the expert factories for pool deployables.
    ///
    /// The connection-pool expert establishes the live pool and ties its
    /// close to the owning scope's teardown; the info-provider expert is
    /// pure construction over already-validated state.
    pub fn bind_deployables(&self, registry: &mut DeployableBindingRegistry) {
        let data_sources = Arc::clone(&self.data_sources);
        let metrics = self.data_sources.metric_registry();
        let session_supplier = self.platform.session_supplier();

        registry
            .bind::<HikariCpConnectionPool>()
            .component(ComponentKind::ConnectionPool)
            .expert_factory(move |ctx: ExpertContext| {
                let data_sources = Arc::clone(&data_sources);
                async move {
                    let config = ctx.deployable::<HikariCpConnectionPool>()?;
                    let source = Arc::new(data_sources.data_source(&config).await?);
                    let close_handle = Arc::clone(&source);
                    ctx.scope()
                        .on_destroy(move || async move { close_handle.close().await })
                        .await;
                    Ok(DeployedExpert::ConnectionSource(source))
                }
            })
            .component(ComponentKind::ConnectionInfoProvider)
            .expert_factory(move |ctx: ExpertContext| {
                let metrics = Arc::clone(&metrics);
                let session_supplier = Arc::clone(&session_supplier);
                async move {
                    let config = ctx.deployable::<HikariCpConnectionPool>()?;
                    let external_id = config.external_id.clone().ok_or_else(|| {
                        DeployError::validation(
                            "Pool deployable has no external id; identity enrichment must run before deployment",
                        )
                    })?;
                    let provider =
                        ConnectionInfoProvider::new(external_id, metrics, session_supplier);
                    Ok(DeployedExpert::InfoProvider(Arc::new(provider)))
                }
            });
        debug!("Bound pool expert factories");
    }
}

/// A fully wired module runtime.
#[derive(Debug)]
pub struct ModuleRuntime {
    pub module: HikariPoolModule,
    pub transformers: DenotationTransformerRegistry,
    pub manager: DeploymentManager,
}

/// Build the module, register its transformers and bindings, and return the
/// runtime handles.
pub fn bootstrap(platform: Arc<dyn PlatformContract>) -> ModuleRuntime {
    let module = HikariPoolModule::new(platform);

    let mut transformers = DenotationTransformerRegistry::new();
    module.bind_transformers(&mut transformers);

    let mut bindings = DeployableBindingRegistry::new();
    module.bind_deployables(&mut bindings);

    let manager = DeploymentManager::new(Arc::new(bindings));
    ModuleRuntime {
        module,
        transformers,
        manager,
    }
}
