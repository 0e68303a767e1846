//! Transformation context and enrichment classification types.

/// Per-run context handed to morphers and enrichers.
///
/// Carries the stable identifier of the denotation instance being
/// transformed. The identifier is supplied by the caller and never generated
/// here; identity enrichment classifies as never applying without one.
#[derive(Debug, Clone, Default)]
pub struct TransformationContext {
    denotation_id: Option<String>,
}

impl TransformationContext {
    /// Context carrying the stable identifier of the denotation instance.
    pub fn with_denotation_id(id: impl Into<String>) -> Self {
        Self {
            denotation_id: Some(id.into()),
        }
    }

    /// Context without an identifier.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn denotation_id(&self) -> Option<&str> {
        self.denotation_id.as_deref()
    }
}

/// Outcome of one enricher invocation.
///
/// Terminal outcomes take the enricher out of the round loop; non-terminal
/// ones get it called again once another enricher has made progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentResult {
    /// Nothing to enrich now, and repeating the call can never change that.
    NothingNowOrEver,
    /// Nothing could be enriched yet; worth retrying after others progressed.
    NothingYet,
    /// Some fields were filled; more may follow in a later round.
    SomethingDone { description: String },
    /// Everything this enricher is responsible for is filled.
    AllDone { description: String },
}

impl EnrichmentResult {
    /// Create a terminal success carrying the change description.
    pub fn all_done(description: impl Into<String>) -> Self {
        Self::AllDone {
            description: description.into(),
        }
    }

    /// Create a partial-progress outcome carrying the change description.
    pub fn something_done(description: impl Into<String>) -> Self {
        Self::SomethingDone {
            description: description.into(),
        }
    }

    /// Check whether this outcome ends the enricher's participation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NothingNowOrEver | Self::AllDone { .. })
    }

    /// Get the change description, if any fields were changed.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::SomethingDone { description } | Self::AllDone { description } => {
                Some(description)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_denotation_id() {
        let ctx = TransformationContext::with_denotation_id("my-db");
        assert_eq!(ctx.denotation_id(), Some("my-db"));
        assert!(TransformationContext::anonymous().denotation_id().is_none());
    }

    #[test]
    fn test_terminal_classification() {
        assert!(EnrichmentResult::NothingNowOrEver.is_terminal());
        assert!(EnrichmentResult::all_done("done").is_terminal());
        assert!(!EnrichmentResult::NothingYet.is_terminal());
        assert!(!EnrichmentResult::something_done("partial").is_terminal());
    }

    #[test]
    fn test_description_accessor() {
        assert_eq!(
            EnrichmentResult::all_done("Configured name").description(),
            Some("Configured name")
        );
        assert!(EnrichmentResult::NothingNowOrEver.description().is_none());
        assert!(EnrichmentResult::NothingYet.description().is_none());
    }
}
