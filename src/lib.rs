//! Hikari Pool Module
//!
//! This library binds database connection descriptors to pooled connection
//! sources: a morpher turns a `DatabaseConnectionDescriptor` into a
//! `HikariCpConnectionPool` deployable, an enricher derives its identity
//! fields, and two expert factories produce the live pooled connection
//! source and its connection info provider at deployment time.

pub mod deploy;
pub mod error;
pub mod info;
pub mod model;
pub mod module;
pub mod platform;
pub mod pool;
pub mod transform;

pub use error::{DeployError, DeployResult};
pub use model::{DatabaseConnectionDescriptor, HikariCpConnectionPool};
pub use module::{HikariPoolModule, ModuleRuntime, bootstrap};
