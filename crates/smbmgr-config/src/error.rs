//! Error types for the configuration-reconciliation core.

use thiserror::Error;

use crate::collaborators::ExternalError;
use crate::resources::ValidationError;
use crate::store::StoreError;

/// Crate-level error for handler operations.
///
/// Per-resource validation failures are reported inside a `ResultGroup`
/// and never surface here; this type covers selector errors, store and
/// collaborator failures, and hard errors raised during synchronization.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    External(#[from] ExternalError),
    /// A selector string failed to parse.
    #[error("invalid resource match: {input:?} does not match a valid resource")]
    InvalidResourceMatch { input: String },
    /// A stored entry did not deserialize into the expected resource.
    #[error("malformed store entry {ns}/{name}: {reason}")]
    MalformedEntry {
        ns: String,
        name: String,
        reason: String,
    },
    /// No configuration entry exists for a cluster's service spec.
    #[error("no share configuration available for cluster {cluster_id}")]
    NoConfigAvailable { cluster_id: String },
}

/// Result type alias using ConfigError as the error type.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts() {
        let err: ConfigError = StoreError::Backend("boom".to_string()).into();
        assert_eq!(err.to_string(), "store backend error: boom");
    }

    #[test]
    fn test_invalid_match_names_input() {
        let err = ConfigError::InvalidResourceMatch {
            input: "volume.x".to_string(),
        };
        assert!(err.to_string().contains("volume.x"));
    }

    #[test]
    fn test_no_config_available_message() {
        let err = ConfigError::NoConfigAvailable {
            cluster_id: "c1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no share configuration available for cluster c1"
        );
    }
}
