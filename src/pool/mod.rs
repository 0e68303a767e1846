//! Pool construction and runtime objects.
//!
//! This module wraps the sqlx pools behind the deployment-facing types: the
//! factory that establishes them, the connection source that owns them, and
//! the shared metric registry they report into.

pub mod db_pool;
pub mod factory;
pub mod metrics;
pub mod source;

pub use db_pool::DbPool;
pub use factory::DataSourceFactory;
pub use metrics::{MetricsSnapshot, PoolMetricsRegistry};
pub use source::{PooledConnectionSource, SourceStatus};
