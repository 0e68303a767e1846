//! Denotation transformer registry.
//!
//! Maps denotation type tags to morpher and enricher functions. The registry
//! is built once at startup by module wiring and only read afterwards.
//! Enrichment runs in rounds so that enrichers depending on fields filled by
//! other enrichers converge without any ordering contract between them.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{DeployError, DeployResult};
use crate::model::Denotation;
use crate::transform::types::{EnrichmentResult, TransformationContext};

/// Upper bound on enrichment rounds before the engine declares non-convergence.
const MAX_ENRICHMENT_ROUNDS: usize = 8;

type ErasedMorpher = Arc<
    dyn Fn(&TransformationContext, Box<dyn Any + Send>) -> DeployResult<Box<dyn Any + Send>>
        + Send
        + Sync,
>;

type ErasedEnricher =
    Arc<dyn Fn(&TransformationContext, &mut dyn Any) -> DeployResult<EnrichmentResult> + Send + Sync>;

struct RegisteredEnricher {
    name: String,
    run: ErasedEnricher,
}

/// Registry mapping denotation type tags to their transformers.
///
/// Morphers are keyed by the (source, target) tag pair; enrichers by the
/// target tag, kept in registration order.
#[derive(Default)]
pub struct DenotationTransformerRegistry {
    morphers: HashMap<(&'static str, &'static str), ErasedMorpher>,
    enrichers: HashMap<&'static str, Vec<RegisteredEnricher>>,
}

impl std::fmt::Debug for DenotationTransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenotationTransformerRegistry")
            .field("morphers", &self.morphers.len())
            .finish_non_exhaustive()
    }
}

impl DenotationTransformerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the standard morpher from denotation type `S` to `T`.
    ///
    /// The morpher must succeed for every well-formed source; fallible
    /// conversion belongs in descriptor parsing, before transformation.
    pub fn register_standard_morpher<S, T, F>(&mut self, morph: F)
    where
        S: Denotation,
        T: Denotation,
        F: Fn(&TransformationContext, S) -> T + Send + Sync + 'static,
    {
        let erased: ErasedMorpher = Arc::new(move |ctx, input| {
            let source = input.downcast::<S>().map_err(|_| {
                DeployError::transformation(format!(
                    "Morpher for '{}' -> '{}' received an unexpected source type",
                    S::TYPE_TAG,
                    T::TYPE_TAG,
                ))
            })?;
            Ok(Box::new(morph(ctx, *source)) as Box<dyn Any + Send>)
        });

        if self
            .morphers
            .insert((S::TYPE_TAG, T::TYPE_TAG), erased)
            .is_some()
        {
            warn!(
                source = S::TYPE_TAG,
                target = T::TYPE_TAG,
                "Replacing registered morpher"
            );
        }
        debug!(
            source = S::TYPE_TAG,
            target = T::TYPE_TAG,
            "Registered standard morpher"
        );
    }

    /// Register a named enricher for denotation type `T`.
    ///
    /// Enrichers mutate the value in place and report what they changed.
    pub fn register_enricher<T, F>(&mut self, name: impl Into<String>, enrich: F)
    where
        T: Denotation,
        F: Fn(&TransformationContext, &mut T) -> EnrichmentResult + Send + Sync + 'static,
    {
        let name = name.into();
        let erased_name = name.clone();
        let run: ErasedEnricher = Arc::new(move |ctx, value| {
            let typed = value.downcast_mut::<T>().ok_or_else(|| {
                DeployError::transformation(format!(
                    "Enricher '{}' for '{}' received an unexpected denotation type",
                    erased_name,
                    T::TYPE_TAG,
                ))
            })?;
            Ok(enrich(ctx, typed))
        });

        debug!(enricher = %name, type_tag = T::TYPE_TAG, "Registered enricher");
        self.enrichers
            .entry(T::TYPE_TAG)
            .or_default()
            .push(RegisteredEnricher { name, run });
    }

    /// Check whether a morpher is registered for the given tag pair.
    pub fn has_morpher(&self, source_tag: &str, target_tag: &str) -> bool {
        self.morphers
            .keys()
            .any(|(s, t)| *s == source_tag && *t == target_tag)
    }

    /// Number of enrichers registered for the given type tag.
    pub fn enricher_count(&self, type_tag: &str) -> usize {
        self.enrichers.get(type_tag).map_or(0, Vec::len)
    }

    /// Morph a source denotation into the target type.
    pub fn morph<S, T>(&self, ctx: &TransformationContext, source: S) -> DeployResult<T>
    where
        S: Denotation,
        T: Denotation,
    {
        let morpher = self
            .morphers
            .get(&(S::TYPE_TAG, T::TYPE_TAG))
            .ok_or_else(|| {
                DeployError::transformation(format!(
                    "No morpher registered for '{}' -> '{}'",
                    S::TYPE_TAG,
                    T::TYPE_TAG,
                ))
            })?;

        let produced = morpher(ctx, Box::new(source))?;
        produced.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            DeployError::transformation(format!(
                "Morpher for '{}' -> '{}' produced an unexpected type",
                S::TYPE_TAG,
                T::TYPE_TAG,
            ))
        })
    }

    /// Run all enrichers registered for `T` until each reports a terminal
    /// outcome.
    ///
    /// Returns the enriched value plus the accumulated change descriptions.
    /// A full round without progress, or more than [`MAX_ENRICHMENT_ROUNDS`]
    /// rounds, is a transformation error.
    pub fn enrich<T>(
        &self,
        ctx: &TransformationContext,
        mut value: T,
    ) -> DeployResult<(T, Vec<String>)>
    where
        T: Denotation,
    {
        let Some(enrichers) = self.enrichers.get(T::TYPE_TAG) else {
            return Ok((value, Vec::new()));
        };

        let mut descriptions = Vec::new();
        let mut terminal = vec![false; enrichers.len()];

        for round in 0..MAX_ENRICHMENT_ROUNDS {
            let mut progressed = false;

            for (idx, enricher) in enrichers.iter().enumerate() {
                if terminal[idx] {
                    continue;
                }
                match (enricher.run)(ctx, &mut value)? {
                    EnrichmentResult::NothingNowOrEver => {
                        debug!(
                            enricher = %enricher.name,
                            type_tag = T::TYPE_TAG,
                            "Enricher will never apply"
                        );
                        terminal[idx] = true;
                    }
                    EnrichmentResult::NothingYet => {}
                    EnrichmentResult::SomethingDone { description } => {
                        debug!(enricher = %enricher.name, round, "Enricher made progress");
                        descriptions.push(description);
                        progressed = true;
                    }
                    EnrichmentResult::AllDone { description } => {
                        debug!(enricher = %enricher.name, round, "Enricher completed");
                        descriptions.push(description);
                        terminal[idx] = true;
                        progressed = true;
                    }
                }
            }

            if terminal.iter().all(|done| *done) {
                return Ok((value, descriptions));
            }
            if !progressed {
                let stalled: Vec<&str> = enrichers
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| !terminal[*idx])
                    .map(|(_, e)| e.name.as_str())
                    .collect();
                return Err(DeployError::transformation(format!(
                    "Enrichment of '{}' stalled, no progress from: {}",
                    T::TYPE_TAG,
                    stalled.join(", ")
                )));
            }
        }

        Err(DeployError::transformation(format!(
            "Enrichment of '{}' did not converge after {} rounds",
            T::TYPE_TAG,
            MAX_ENRICHMENT_ROUNDS
        )))
    }

    /// Morph then enrich, the common transformation path.
    pub fn transform<S, T>(
        &self,
        ctx: &TransformationContext,
        source: S,
    ) -> DeployResult<(T, Vec<String>)>
    where
        S: Denotation,
        T: Denotation,
    {
        let morphed = self.morph::<S, T>(ctx, source)?;
        self.enrich(ctx, morphed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Draft {
        text: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Document {
        text: String,
        label: Option<String>,
        footer: Option<String>,
    }

    impl Denotation for Draft {
        const TYPE_TAG: &'static str = "Draft";
    }

    impl Denotation for Document {
        const TYPE_TAG: &'static str = "Document";
    }

    fn registry_with_morpher() -> DenotationTransformerRegistry {
        let mut registry = DenotationTransformerRegistry::new();
        registry.register_standard_morpher(|_ctx, draft: Draft| Document {
            text: draft.text,
            label: None,
            footer: None,
        });
        registry
    }

    #[test]
    fn test_morph_dispatches_by_tag_pair() {
        let registry = registry_with_morpher();
        let doc: Document = registry
            .morph(
                &TransformationContext::anonymous(),
                Draft {
                    text: "hello".to_string(),
                },
            )
            .expect("morpher registered");
        assert_eq!(doc.text, "hello");
        assert!(doc.label.is_none());
    }

    #[test]
    fn test_morph_without_registration_fails() {
        let registry = DenotationTransformerRegistry::new();
        let result: DeployResult<Document> = registry.morph(
            &TransformationContext::anonymous(),
            Draft {
                text: "hello".to_string(),
            },
        );
        let err = result.err().expect("no morpher registered");
        assert!(err.to_string().contains("No morpher registered"));
    }

    #[test]
    fn test_enrich_without_enrichers_is_identity() {
        let registry = DenotationTransformerRegistry::new();
        let doc = Document {
            text: "hello".to_string(),
            label: None,
            footer: None,
        };
        let (enriched, changes) = registry
            .enrich(&TransformationContext::anonymous(), doc.clone())
            .expect("no enrichers is fine");
        assert_eq!(enriched, doc);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_enrich_runs_until_terminal() {
        let mut registry = DenotationTransformerRegistry::new();
        let label_calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&label_calls);

        registry.register_enricher("labeler", move |_ctx, doc: &mut Document| {
            counted.fetch_add(1, Ordering::SeqCst);
            if doc.label.is_some() {
                return EnrichmentResult::NothingNowOrEver;
            }
            doc.label = Some("v1".to_string());
            EnrichmentResult::all_done("Set label to [v1]")
        });

        let (enriched, changes) = registry
            .enrich(
                &TransformationContext::anonymous(),
                Document {
                    text: "hello".to_string(),
                    label: None,
                    footer: None,
                },
            )
            .expect("converges");

        assert_eq!(enriched.label.as_deref(), Some("v1"));
        assert_eq!(changes, vec!["Set label to [v1]".to_string()]);
        // Terminal after the first call, never invoked again
        assert_eq!(label_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_enrich_retries_nothing_yet_after_progress() {
        let mut registry = DenotationTransformerRegistry::new();
        let footer_calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&footer_calls);

        // Registered first, depends on the label filled by the second
        registry.register_enricher("footer", move |_ctx, doc: &mut Document| {
            counted.fetch_add(1, Ordering::SeqCst);
            match &doc.label {
                None => EnrichmentResult::NothingYet,
                Some(label) => {
                    doc.footer = Some(format!("footer for {label}"));
                    EnrichmentResult::all_done("Set footer")
                }
            }
        });
        registry.register_enricher("labeler", |_ctx, doc: &mut Document| {
            doc.label = Some("v1".to_string());
            EnrichmentResult::all_done("Set label")
        });

        let (enriched, changes) = registry
            .enrich(
                &TransformationContext::anonymous(),
                Document {
                    text: "hello".to_string(),
                    label: None,
                    footer: None,
                },
            )
            .expect("converges in two rounds");

        assert_eq!(enriched.footer.as_deref(), Some("footer for v1"));
        assert_eq!(changes.len(), 2);
        // Round one returned NothingYet, round two completed
        assert_eq!(footer_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_enrich_stall_is_an_error() {
        let mut registry = DenotationTransformerRegistry::new();
        registry.register_enricher("waiter", |_ctx, _doc: &mut Document| {
            EnrichmentResult::NothingYet
        });

        let result = registry.enrich(
            &TransformationContext::anonymous(),
            Document {
                text: "hello".to_string(),
                label: None,
                footer: None,
            },
        );
        let err = result.err().expect("stall detected");
        assert!(err.to_string().contains("stalled"));
        assert!(err.to_string().contains("waiter"));
    }

    #[test]
    fn test_enrich_round_cap_is_an_error() {
        let mut registry = DenotationTransformerRegistry::new();
        registry.register_enricher("churner", |_ctx, doc: &mut Document| {
            doc.text.push('x');
            EnrichmentResult::something_done("Appended")
        });

        let result = registry.enrich(
            &TransformationContext::anonymous(),
            Document {
                text: String::new(),
                label: None,
                footer: None,
            },
        );
        let err = result.err().expect("cap trips");
        assert!(err.to_string().contains("did not converge"));
    }

    #[test]
    fn test_transform_chains_morph_and_enrich() {
        let mut registry = registry_with_morpher();
        registry.register_enricher("labeler", |_ctx, doc: &mut Document| {
            if doc.label.is_some() {
                return EnrichmentResult::NothingNowOrEver;
            }
            doc.label = Some("v1".to_string());
            EnrichmentResult::all_done("Set label")
        });

        let (doc, changes): (Document, _) = registry
            .transform(
                &TransformationContext::anonymous(),
                Draft {
                    text: "hello".to_string(),
                },
            )
            .expect("full pipeline");
        assert_eq!(doc.text, "hello");
        assert_eq!(doc.label.as_deref(), Some("v1"));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_has_morpher_and_enricher_count() {
        let mut registry = registry_with_morpher();
        assert!(registry.has_morpher("Draft", "Document"));
        assert!(!registry.has_morpher("Document", "Draft"));
        assert_eq!(registry.enricher_count("Document"), 0);

        registry.register_enricher("labeler", |_ctx, _doc: &mut Document| {
            EnrichmentResult::NothingNowOrEver
        });
        assert_eq!(registry.enricher_count("Document"), 1);
    }
}
