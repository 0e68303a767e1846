//! Denotation model types for the deployment module.
//!
//! This module re-exports the descriptor and deployable types used throughout
//! the transformation and deployment stages.

pub mod deployable;
pub mod descriptor;

// Re-export commonly used types
pub use deployable::{Denotation, Deployable, HikariCpConnectionPool};
pub use descriptor::{
    DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MAX_CONNECTIONS_SQLITE, DEFAULT_MIN_CONNECTIONS, DatabaseConnectionDescriptor,
    DatabaseType, PoolOptions,
};
