//! Error types for the deployment module.
//!
//! All errors use `thiserror` and carry actionable messages so the host can
//! report why a transformation or deployment was rejected. Enrichment no-ops
//! are classifications, not errors, and never appear here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration error: {message}")]
    Configuration { message: String, suggestion: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Transformation error: {message}")]
    Transformation { message: String },

    #[error("Construction failed: {message}")]
    Construction { message: String, suggestion: String },

    #[error("Deployable '{external_id}' is already deployed")]
    AlreadyDeployed { external_id: String },

    #[error("Deployment not found: {external_id}")]
    NotFound { external_id: String },

    #[error("Deployment manager is shut down")]
    ShutDown,
}

impl DeployError {
    /// Create a configuration error with a helpful suggestion.
    pub fn configuration(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a transformation error.
    pub fn transformation(message: impl Into<String>) -> Self {
        Self::Transformation {
            message: message.into(),
        }
    }

    /// Create a construction error with a helpful suggestion.
    pub fn construction(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an already deployed error.
    pub fn already_deployed(external_id: impl Into<String>) -> Self {
        Self::AlreadyDeployed {
            external_id: external_id.into(),
        }
    }

    /// Create a deployment not found error.
    pub fn not_found(external_id: impl Into<String>) -> Self {
        Self::NotFound {
            external_id: external_id.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Configuration { suggestion, .. } => Some(suggestion),
            Self::Construction { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error ends the deployment attempt for good.
    ///
    /// Construction failures are fatal and surfaced to the host without
    /// local retry; configuration and validation errors are correctable by
    /// the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Construction { .. } | Self::ShutDown)
    }
}

/// Convert sqlx errors raised during pool establishment.
impl From<sqlx::Error> for DeployError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DeployError::configuration(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => DeployError::construction(
                db_err.message().to_string(),
                "Check that the target database exists and the user has access",
            ),
            sqlx::Error::PoolTimedOut => DeployError::construction(
                "Timed out acquiring a connection from the pool",
                "Check that the database server is reachable",
            ),
            sqlx::Error::PoolClosed => DeployError::construction(
                "Connection pool is closed",
                "The pooled connection source was already torn down",
            ),
            sqlx::Error::Io(io_err) => DeployError::construction(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DeployError::construction(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DeployError::construction(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            _ => DeployError::construction(
                format!("Pool establishment failed: {}", err),
                "Check the connection descriptor and database server logs",
            ),
        }
    }
}

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;
