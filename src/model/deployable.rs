//! Deployable denotation types.
//!
//! A denotation is a plain configuration object identified by a stable type
//! tag; a deployable is a denotation that expert factories can turn into a
//! live runtime component. Type tags are the registry keys used for morpher,
//! enricher and expert lookup.

use serde::{Deserialize, Serialize};

use crate::model::descriptor::DatabaseConnectionDescriptor;

/// A configuration object addressable by a stable type tag.
pub trait Denotation: Send + Sync + 'static {
    /// Registry key for this denotation type. Must be unique per type.
    const TYPE_TAG: &'static str;
}

/// A denotation that produces runtime components through bound expert factories.
pub trait Deployable: Denotation {
    /// Stable identity of the deployed instance, set by enrichment.
    fn external_id(&self) -> Option<&str>;

    /// Human-readable name, set by enrichment.
    fn name(&self) -> Option<&str>;
}

impl Denotation for DatabaseConnectionDescriptor {
    const TYPE_TAG: &'static str = "DatabaseConnectionDescriptor";
}

/// The connection-pool deployable.
///
/// Produced from a [`DatabaseConnectionDescriptor`] by the standard morpher
/// with all identity fields unset; the pool enricher fills `name`,
/// `external_id` and `global_id`. Once `external_id` is set it is never
/// overwritten, and `global_id` mirrors it when previously unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HikariCpConnectionPool {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub global_id: Option<String>,
    pub connection_descriptor: DatabaseConnectionDescriptor,
}

impl HikariCpConnectionPool {
    /// Wrap a descriptor into an unenriched pool deployable.
    pub fn from_descriptor(descriptor: DatabaseConnectionDescriptor) -> Self {
        Self {
            name: None,
            external_id: None,
            global_id: None,
            connection_descriptor: descriptor,
        }
    }

    /// Check whether every identity field has been filled in.
    pub fn is_enriched(&self) -> bool {
        self.name.is_some() && self.external_id.is_some() && self.global_id.is_some()
    }
}

impl From<DatabaseConnectionDescriptor> for HikariCpConnectionPool {
    fn from(descriptor: DatabaseConnectionDescriptor) -> Self {
        Self::from_descriptor(descriptor)
    }
}

impl Denotation for HikariCpConnectionPool {
    const TYPE_TAG: &'static str = "HikariCpConnectionPool";
}

impl Deployable for HikariCpConnectionPool {
    fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> DatabaseConnectionDescriptor {
        DatabaseConnectionDescriptor::parse("sqlite:data/test.db").expect("valid descriptor")
    }

    #[test]
    fn test_from_descriptor_preserves_descriptor() {
        let desc = descriptor();
        let pool = HikariCpConnectionPool::from_descriptor(desc.clone());
        assert_eq!(pool.connection_descriptor, desc);
        assert!(pool.name.is_none());
        assert!(pool.external_id.is_none());
        assert!(pool.global_id.is_none());
    }

    #[test]
    fn test_is_enriched() {
        let mut pool = HikariCpConnectionPool::from_descriptor(descriptor());
        assert!(!pool.is_enriched());
        pool.name = Some("Test".to_string());
        pool.external_id = Some("edr2cc:test:hikari".to_string());
        assert!(!pool.is_enriched());
        pool.global_id = Some("edr2cc:test:hikari".to_string());
        assert!(pool.is_enriched());
    }

    #[test]
    fn test_type_tags_are_distinct() {
        assert_ne!(
            DatabaseConnectionDescriptor::TYPE_TAG,
            HikariCpConnectionPool::TYPE_TAG
        );
    }
}
