//! Host platform contract.
//!
//! The module never reaches into the host; everything it needs arrives
//! through this trait at construction time. The only capability the module
//! consumes today is a session supplier for the info providers.

use std::sync::Arc;

/// Handle to a host platform session.
///
/// Opaque to this module; the info provider hands it through to callers.
#[derive(Debug, Clone)]
pub struct PlatformSession {
    session_domain: String,
}

impl PlatformSession {
    pub fn new(session_domain: impl Into<String>) -> Self {
        Self {
            session_domain: session_domain.into(),
        }
    }

    /// The host domain this session is bound to.
    pub fn session_domain(&self) -> &str {
        &self.session_domain
    }
}

/// Supplier handing out host platform sessions on demand.
pub type SessionSupplier = Arc<dyn Fn() -> PlatformSession + Send + Sync>;

/// Capabilities the host platform provides to this module.
pub trait PlatformContract: Send + Sync {
    /// Supplier of sessions against the host's configuration domain.
    fn session_supplier(&self) -> SessionSupplier;
}

/// Platform contract backed by a fixed session domain.
///
/// Suitable for embedding and tests; real hosts implement
/// [`PlatformContract`] against their own session infrastructure.
#[derive(Debug, Clone)]
pub struct StaticPlatform {
    session_domain: String,
}

impl StaticPlatform {
    pub fn new(session_domain: impl Into<String>) -> Self {
        Self {
            session_domain: session_domain.into(),
        }
    }
}

impl PlatformContract for StaticPlatform {
    fn session_supplier(&self) -> SessionSupplier {
        let domain = self.session_domain.clone();
        Arc::new(move || PlatformSession::new(domain.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_platform_supplies_sessions() {
        let platform = StaticPlatform::new("cortex");
        let supplier = platform.session_supplier();
        assert_eq!(supplier().session_domain(), "cortex");
        // Every call yields a fresh session against the same domain
        assert_eq!(supplier().session_domain(), "cortex");
    }
}
