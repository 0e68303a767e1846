//! Denotation transformation stage.
//!
//! Morphers convert one denotation type into another; enrichers fill missing
//! fields in place. Both are registered against denotation type tags in a
//! [`DenotationTransformerRegistry`] built once at startup.

pub mod registry;
pub mod types;

pub use registry::DenotationTransformerRegistry;
pub use types::{EnrichmentResult, TransformationContext};
