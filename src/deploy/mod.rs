//! Deployment wiring: expert bindings, instance scopes, and the manager.

pub mod binding;
pub mod manager;
pub mod scope;

pub use binding::{
    ComponentKind, DeployableBindingRegistry, DeployedExpert, ExpertContext, ExpertFactory,
};
pub use manager::{DeploymentManager, DeploymentSummary};
pub use scope::InstanceScope;
