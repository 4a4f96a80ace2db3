//! Error Types
//!
//! Error taxonomy for the enrichment layer. Fatal configuration problems
//! abort a run before any writes; store failures are retryable at the
//! batch level; per-record resolution gaps are counted, not raised.

use thiserror::Error;

/// Error type for enrichment operations
#[derive(Error, Debug, Clone)]
pub enum EnrichmentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Required vector index not found: {index}")]
    VectorIndexMissing { index: String },

    #[error("{store} store unavailable: {message}")]
    StoreUnavailable { store: String, message: String },

    #[error("Score '{name}' out of range: {value} (expected [0,1])")]
    ScoreOutOfRange { name: String, value: f64 },

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type for enrichment operations
pub type EnrichmentResult<T> = Result<T, EnrichmentError>;

impl EnrichmentError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a store-unavailable error for the named store
    pub fn store_unavailable<S: Into<String>, M: Into<String>>(store: S, message: M) -> Self {
        Self::StoreUnavailable {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::Serialization(msg.into())
    }

    /// Check if the error is retryable at the batch level
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// Check if the error must abort the whole run before any writes
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::VectorIndexMissing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(EnrichmentError::store_unavailable("graph", "connection refused").is_retryable());

        assert!(!EnrichmentError::configuration("weights sum to 0.9").is_retryable());

        assert!(!EnrichmentError::ScoreOutOfRange {
            name: "price".to_string(),
            value: 1.3
        }
        .is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(EnrichmentError::configuration("bad weights").is_fatal());

        assert!(EnrichmentError::VectorIndexMissing {
            index: "property_embedding_idx".to_string()
        }
        .is_fatal());

        assert!(!EnrichmentError::store_unavailable("document", "timeout").is_fatal());
    }
}
