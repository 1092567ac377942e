use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::SyncReport;

/// The external collaborator a provider call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Embedding,
    VectorIndex,
    Catalog,
    Generation,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedding => "embedding provider",
            Self::VectorIndex => "vector index",
            Self::Catalog => "catalog",
            Self::Generation => "generation provider",
        };
        f.write_str(name)
    }
}

/// A failed call to one of the external providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider asked us to slow down.
    #[error("rate limited by {provider}")]
    RateLimited { provider: Provider },

    /// The per-call timeout elapsed before the provider answered.
    #[error("{provider} request timed out")]
    Timeout { provider: Provider },

    /// The connection failed before a response was received.
    #[error("request to {provider} failed: {message}")]
    Transport { provider: Provider, message: String },

    /// The provider answered with an unexpected HTTP status.
    #[error("HTTP {status} from {provider}: {message}")]
    Http {
        provider: Provider,
        status: u16,
        message: String,
    },

    /// Authentication or request validation failed; retrying will not help.
    #[error("{provider} rejected the request: {message}")]
    Rejected { provider: Provider, message: String },

    /// The requested entity does not exist at the provider.
    #[error("not found: {entity} at {provider}")]
    NotFound { provider: Provider, entity: String },

    /// The provider's response could not be decoded.
    #[error("parse error from {provider}: {message}")]
    Parse { provider: Provider, message: String },

    /// The caller supplied empty text where content is required.
    #[error("empty input text for {provider}")]
    EmptyInput { provider: Provider },
}

impl ProviderError {
    /// Returns `true` when the error is transient and the call may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Rejected { .. }
            | Self::NotFound { .. }
            | Self::Parse { .. }
            | Self::EmptyInput { .. } => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The provider this error originated from.
    pub fn provider(&self) -> Provider {
        match self {
            Self::RateLimited { provider }
            | Self::Timeout { provider }
            | Self::Transport { provider, .. }
            | Self::Http { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::NotFound { provider, .. }
            | Self::Parse { provider, .. }
            | Self::EmptyInput { provider } => *provider,
        }
    }
}

/// Pipeline-level errors.
///
/// Variants map onto four classes: configuration errors (fatal at
/// startup), provider errors tagged with the stage that failed, data
/// errors for a single malformed record, and validation errors for bad
/// request parameters.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    /// A vector whose length differs from the index dimensionality.
    #[error("dimension mismatch for {context}: expected {expected}, found {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("embedding failed: {0}")]
    Embedding(#[source] ProviderError),

    /// Ensure-index or upsert failure.
    #[error("vector index operation failed: {0}")]
    Index(#[source] ProviderError),

    /// Similarity query failure on the query path.
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] ProviderError),

    #[error("catalog lookup failed: {0}")]
    Catalog(#[source] ProviderError),

    #[error("generation failed: {0}")]
    Generation(#[source] ProviderError),

    /// A sync run stopped part way; `report` holds what was confirmed.
    #[error("sync of section '{}' aborted after {} batches: {source}", .report.section, .report.batches_upserted)]
    SyncAborted {
        report: Box<SyncReport>,
        source: Box<Error>,
    },

    #[error("invalid record {id}: {reason}")]
    Data { id: String, reason: String },

    #[error("invalid request: {0}")]
    Validation(String),
}

impl Error {
    /// Name of the stage that failed, for user-visible responses.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::DimensionMismatch { .. } => "configuration",
            Self::Embedding(_) => "embedding",
            Self::Index(_) => "index",
            Self::Retrieval(_) => "retrieval",
            Self::Catalog(_) => "catalog",
            Self::Generation(_) => "generation",
            Self::SyncAborted { source, .. } => source.stage(),
            Self::Data { .. } => "data",
            Self::Validation(_) => "validation",
        }
    }

    /// Returns `true` for fatal configuration problems, including ones
    /// that aborted a sync run.
    pub fn is_config(&self) -> bool {
        match self {
            Self::Config(_) | Self::DimensionMismatch { .. } => true,
            Self::SyncAborted { source, .. } => source.is_config(),
            _ => false,
        }
    }

    /// The partial report of an aborted sync run, if any.
    pub fn partial_report(&self) -> Option<&SyncReport> {
        match self {
            Self::SyncAborted { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Wrap the fatal `source` of a sync run together with its partial report.
    pub fn aborted(report: SyncReport, source: Error) -> Self {
        Self::SyncAborted {
            report: Box::new(report),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience alias for provider call results.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let provider = Provider::Embedding;
        assert!(ProviderError::RateLimited { provider }.is_transient());
        assert!(ProviderError::Timeout { provider }.is_transient());
        assert!(ProviderError::Http {
            provider,
            status: 503,
            message: String::new(),
        }
        .is_transient());
        assert!(!ProviderError::Http {
            provider,
            status: 404,
            message: String::new(),
        }
        .is_transient());
        assert!(!ProviderError::Rejected {
            provider,
            message: "bad key".to_string(),
        }
        .is_transient());
        assert!(!ProviderError::EmptyInput { provider }.is_transient());
    }

    #[test]
    fn test_stage_names_distinguish_retrieval_from_generation() {
        let retrieval = Error::Retrieval(ProviderError::Timeout {
            provider: Provider::VectorIndex,
        });
        let generation = Error::Generation(ProviderError::Timeout {
            provider: Provider::Generation,
        });
        assert_eq!(retrieval.stage(), "retrieval");
        assert_eq!(generation.stage(), "generation");
    }

    #[test]
    fn test_sync_aborted_carries_report_and_stage() {
        let mut report = SyncReport::new("Movies");
        report.batches_upserted = 2;
        let err = Error::aborted(
            report,
            Error::Index(ProviderError::Http {
                provider: Provider::VectorIndex,
                status: 500,
                message: "boom".to_string(),
            }),
        );
        assert_eq!(err.stage(), "index");
        assert!(!err.is_config());
        assert_eq!(err.partial_report().map(|r| r.batches_upserted), Some(2));
        assert!(err.to_string().contains("Movies"));
    }

    #[test]
    fn test_dimension_mismatch_is_config() {
        let err = Error::DimensionMismatch {
            context: "index 'media'".to_string(),
            expected: 1536,
            actual: 768,
        };
        assert!(err.is_config());
        assert_eq!(err.stage(), "configuration");
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(Provider::VectorIndex.to_string(), "vector index");
        let err = ProviderError::NotFound {
            provider: Provider::Catalog,
            entity: "record 42".to_string(),
        };
        assert_eq!(err.to_string(), "not found: record 42 at catalog");
        assert!(err.is_not_found());
    }
}
