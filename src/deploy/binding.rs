//! Deployable expert bindings.
//!
//! Maps a (denotation type tag, component kind) pair to the factory that
//! turns the deployable into its runtime object. Bindings are registered with
//! a fluent chain at module wiring time and looked up at deployment time, so
//! no runtime reflection is involved.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, warn};

use crate::deploy::scope::InstanceScope;
use crate::error::{DeployError, DeployResult};
use crate::info::ConnectionInfoProvider;
use crate::model::{Denotation, Deployable};
use crate::pool::PooledConnectionSource;

/// Component axis of an expert binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    ConnectionPool,
    ConnectionInfoProvider,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionPool => write!(f, "connection_pool"),
            Self::ConnectionInfoProvider => write!(f, "connection_info_provider"),
        }
    }
}

/// Runtime object produced by an expert factory.
#[derive(Debug, Clone)]
pub enum DeployedExpert {
    ConnectionSource(Arc<PooledConnectionSource>),
    InfoProvider(Arc<ConnectionInfoProvider>),
}

impl DeployedExpert {
    /// The component kind this expert fulfills.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::ConnectionSource(_) => ComponentKind::ConnectionPool,
            Self::InfoProvider(_) => ComponentKind::ConnectionInfoProvider,
        }
    }

    pub fn as_connection_source(&self) -> Option<&Arc<PooledConnectionSource>> {
        match self {
            Self::ConnectionSource(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_info_provider(&self) -> Option<&Arc<ConnectionInfoProvider>> {
        match self {
            Self::InfoProvider(provider) => Some(provider),
            _ => None,
        }
    }
}

/// Everything an expert factory gets to work with: the deployable being
/// deployed and the scope its teardown belongs to.
#[derive(Clone)]
pub struct ExpertContext {
    deployable: Arc<dyn Any + Send + Sync>,
    type_tag: &'static str,
    scope: Arc<InstanceScope>,
}

impl std::fmt::Debug for ExpertContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpertContext")
            .field("type_tag", &self.type_tag)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ExpertContext {
    pub fn new<D: Deployable>(deployable: Arc<D>, scope: Arc<InstanceScope>) -> Self {
        Self {
            deployable,
            type_tag: D::TYPE_TAG,
            scope,
        }
    }

    /// Type tag of the deployable being deployed.
    pub fn type_tag(&self) -> &'static str {
        self.type_tag
    }

    /// The scope owning this deployment's teardown.
    pub fn scope(&self) -> &Arc<InstanceScope> {
        &self.scope
    }

    /// Downcast the deployable to its concrete type.
    pub fn deployable<D: Deployable>(&self) -> DeployResult<Arc<D>> {
        Arc::clone(&self.deployable).downcast::<D>().map_err(|_| {
            DeployError::transformation(format!(
                "Expert factory received deployable '{}' but expected '{}'",
                self.type_tag,
                D::TYPE_TAG,
            ))
        })
    }
}

/// Type-erased expert factory as stored in the registry.
pub type ExpertFactory =
    Arc<dyn Fn(ExpertContext) -> BoxFuture<'static, DeployResult<DeployedExpert>> + Send + Sync>;

/// Registry of expert factories, keyed by (type tag, component kind).
#[derive(Default)]
pub struct DeployableBindingRegistry {
    bindings: HashMap<(&'static str, ComponentKind), ExpertFactory>,
}

impl DeployableBindingRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fluent binding for deployable type `D`.
    ///
    /// ```text
    /// registry
    ///     .bind::<HikariCpConnectionPool>()
    ///     .component(ComponentKind::ConnectionPool)
    ///     .expert_factory(pool_factory)
    ///     .component(ComponentKind::ConnectionInfoProvider)
    ///     .expert_factory(info_factory);
    /// ```
    pub fn bind<D: Denotation>(&mut self) -> BindingBuilder<'_> {
        BindingBuilder {
            registry: self,
            type_tag: D::TYPE_TAG,
        }
    }

    /// Look up the factory bound for a (type tag, component kind) pair.
    pub fn factory(&self, type_tag: &str, kind: ComponentKind) -> Option<ExpertFactory> {
        self.bindings
            .iter()
            .find(|((tag, bound_kind), _)| *tag == type_tag && *bound_kind == kind)
            .map(|(_, factory)| Arc::clone(factory))
    }

    /// All factories bound for a type tag, ordered by component kind so
    /// deployment order is deterministic.
    pub fn factories_for(&self, type_tag: &str) -> Vec<(ComponentKind, ExpertFactory)> {
        let mut factories: Vec<(ComponentKind, ExpertFactory)> = self
            .bindings
            .iter()
            .filter(|((tag, _), _)| *tag == type_tag)
            .map(|((_, kind), factory)| (*kind, Arc::clone(factory)))
            .collect();
        factories.sort_by_key(|(kind, _)| *kind);
        factories
    }

    /// Total number of registered bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

/// First stage of the fluent binding chain: the deployable type is fixed.
pub struct BindingBuilder<'a> {
    registry: &'a mut DeployableBindingRegistry,
    type_tag: &'static str,
}

impl<'a> BindingBuilder<'a> {
    /// Pick the component kind this binding fulfills.
    pub fn component(self, kind: ComponentKind) -> ComponentBindingBuilder<'a> {
        ComponentBindingBuilder {
            registry: self.registry,
            type_tag: self.type_tag,
            kind,
        }
    }
}

/// Second stage of the fluent binding chain: type and component are fixed.
pub struct ComponentBindingBuilder<'a> {
    registry: &'a mut DeployableBindingRegistry,
    type_tag: &'static str,
    kind: ComponentKind,
}

impl<'a> ComponentBindingBuilder<'a> {
    /// Bind the expert factory and return to the binding stage, so further
    /// components of the same deployable can be chained.
    pub fn expert_factory<F, Fut>(self, factory: F) -> BindingBuilder<'a>
    where
        F: Fn(ExpertContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DeployResult<DeployedExpert>> + Send + 'static,
    {
        let erased: ExpertFactory = Arc::new(move |ctx| Box::pin(factory(ctx)));
        if self
            .registry
            .bindings
            .insert((self.type_tag, self.kind), erased)
            .is_some()
        {
            warn!(
                type_tag = self.type_tag,
                component = %self.kind,
                "Replacing expert factory binding"
            );
        }
        debug!(
            type_tag = self.type_tag,
            component = %self.kind,
            "Bound expert factory"
        );
        BindingBuilder {
            registry: self.registry,
            type_tag: self.type_tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DatabaseConnectionDescriptor, HikariCpConnectionPool};
    use crate::platform::{PlatformContract, StaticPlatform};
    use crate::pool::PoolMetricsRegistry;

    fn info_expert(external_id: &str) -> DeployedExpert {
        DeployedExpert::InfoProvider(Arc::new(ConnectionInfoProvider::new(
            external_id.to_string(),
            Arc::new(PoolMetricsRegistry::new()),
            StaticPlatform::new("cortex").session_supplier(),
        )))
    }

    fn deployable() -> Arc<HikariCpConnectionPool> {
        let descriptor =
            DatabaseConnectionDescriptor::parse("sqlite:data/test.db").expect("valid descriptor");
        Arc::new(HikariCpConnectionPool::from_descriptor(descriptor))
    }

    #[tokio::test]
    async fn test_bind_and_invoke_factory() {
        let mut registry = DeployableBindingRegistry::new();
        registry
            .bind::<HikariCpConnectionPool>()
            .component(ComponentKind::ConnectionInfoProvider)
            .expert_factory(|ctx: ExpertContext| async move {
                let config = ctx.deployable::<HikariCpConnectionPool>()?;
                let id = config.external_id.clone().unwrap_or_else(|| "none".into());
                Ok(info_expert(&id))
            });

        assert_eq!(registry.binding_count(), 1);
        let factory = registry
            .factory(
                HikariCpConnectionPool::TYPE_TAG,
                ComponentKind::ConnectionInfoProvider,
            )
            .expect("bound");

        let ctx = ExpertContext::new(deployable(), Arc::new(InstanceScope::new()));
        let expert = factory(ctx).await.expect("factory succeeds");
        assert_eq!(expert.kind(), ComponentKind::ConnectionInfoProvider);
    }

    #[tokio::test]
    async fn test_factories_for_ordered_by_kind() {
        let mut registry = DeployableBindingRegistry::new();
        registry
            .bind::<HikariCpConnectionPool>()
            .component(ComponentKind::ConnectionInfoProvider)
            .expert_factory(|_ctx| async { Ok(info_expert("a")) })
            .component(ComponentKind::ConnectionPool)
            .expert_factory(|_ctx| async { Ok(info_expert("b")) });

        let kinds: Vec<ComponentKind> = registry
            .factories_for(HikariCpConnectionPool::TYPE_TAG)
            .iter()
            .map(|(kind, _)| *kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ComponentKind::ConnectionPool,
                ComponentKind::ConnectionInfoProvider
            ]
        );
    }

    #[tokio::test]
    async fn test_unbound_lookup_returns_none() {
        let registry = DeployableBindingRegistry::new();
        assert!(
            registry
                .factory("HikariCpConnectionPool", ComponentKind::ConnectionPool)
                .is_none()
        );
        assert!(registry.factories_for("HikariCpConnectionPool").is_empty());
    }

    #[tokio::test]
    async fn test_context_downcast_mismatch_is_an_error() {
        #[derive(Debug)]
        struct OtherDeployable;
        impl Denotation for OtherDeployable {
            const TYPE_TAG: &'static str = "OtherDeployable";
        }
        impl Deployable for OtherDeployable {
            fn external_id(&self) -> Option<&str> {
                None
            }
            fn name(&self) -> Option<&str> {
                None
            }
        }

        let ctx = ExpertContext::new(deployable(), Arc::new(InstanceScope::new()));
        let result = ctx.deployable::<OtherDeployable>();
        let err = result.err().expect("downcast fails");
        assert!(err.to_string().contains("expected"));
    }
}
