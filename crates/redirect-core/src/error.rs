//! Error types for redirect reconciliation
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed redirect document or invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or unusable API credential
    #[error("Credential error: {0}")]
    Credential(String),

    /// Zone or remote object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider refused to create an object because a quantity limit was hit
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// A failure while reconciling one zone
    #[error("zone {zone}: {source}")]
    Zone {
        /// Zone name
        zone: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a credential error
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a limit-exceeded error
    pub fn limit_exceeded(msg: impl Into<String>) -> Self {
        Self::LimitExceeded(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Attach the zone being processed
    pub fn in_zone(self, zone: impl Into<String>) -> Self {
        Self::Zone {
            zone: zone.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a quantity-limit rejection
    pub fn is_limit_exceeded(&self) -> bool {
        match self {
            Self::LimitExceeded(_) => true,
            Self::Zone { source, .. } => source.is_limit_exceeded(),
            _ => false,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_context_is_prefixed() {
        let err = Error::not_found("Zone not found for domain: example.com").in_zone("example.com");
        assert_eq!(
            err.to_string(),
            "zone example.com: Not found: Zone not found for domain: example.com"
        );
    }

    #[test]
    fn limit_detection_sees_through_zone_context() {
        assert!(Error::limit_exceeded("too many rulesets").is_limit_exceeded());
        assert!(
            Error::limit_exceeded("too many rulesets")
                .in_zone("example.com")
                .is_limit_exceeded()
        );
        assert!(!Error::provider("cloudflare", "boom").is_limit_exceeded());
    }
}
