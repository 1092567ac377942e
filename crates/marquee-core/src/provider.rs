//! Contracts for the four external collaborators.
//!
//! The pipelines only see these traits; concrete HTTP clients live in
//! `marquee-etl` and tests substitute in-process doubles.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::{Error, ProviderResult, Result};
use crate::llm::SupportedModel;
use crate::model::{
    CatalogRecord, EmbeddingVector, IndexEntry, IndexSpec, IndexStatus, RecordId, RetrievalMatch,
};

/// Lazily enumerated catalog records.
pub type RecordStream<'a> = BoxStream<'a, ProviderResult<CatalogRecord>>;

/// Text to fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`.
    ///
    /// Fails with `ProviderError::EmptyInput` on blank text and with
    /// `ProviderError::RateLimited` when the provider throttles.
    async fn embed(&self, text: &str) -> ProviderResult<EmbeddingVector>;
}

/// Vector store holding one entry per catalog record.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Look up an index by name; `None` when it does not exist.
    async fn describe_index(&self, name: &str) -> ProviderResult<Option<IndexSpec>>;

    async fn create_index(&self, spec: &IndexSpec) -> ProviderResult<()>;

    /// Insert or overwrite entries by identifier.
    ///
    /// All-or-nothing from the caller's point of view: an error means
    /// the batch must be treated as not written.
    async fn upsert(&self, index: &str, entries: &[IndexEntry]) -> ProviderResult<()>;

    /// The `top_k` nearest entries, most similar first.
    async fn query(
        &self,
        index: &str,
        vector: &EmbeddingVector,
        top_k: usize,
    ) -> ProviderResult<Vec<RetrievalMatch>>;

    /// Remove entries by identifier. Unknown identifiers are ignored.
    async fn delete(&self, index: &str, ids: &[RecordId]) -> ProviderResult<()>;

    /// Create the index described by `spec` unless it already exists.
    ///
    /// Idempotent. An existing index with a different dimensionality is
    /// reported as a configuration error and left untouched.
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexStatus> {
        let existing = self
            .describe_index(&spec.name)
            .await
            .map_err(Error::Index)?;

        if let Some(existing) = existing {
            spec.check_compatible(&existing)?;
            log::debug!("Index '{}' already exists", spec.name);
            return Ok(IndexStatus::Existing);
        }

        log::info!(
            "Creating index '{}' (dimension {}, metric {})",
            spec.name,
            spec.dimension,
            spec.metric
        );
        self.create_index(spec).await.map_err(Error::Index)?;
        Ok(IndexStatus::Created)
    }
}

/// The media library.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Enumerate every record in the named section.
    ///
    /// Each call starts a fresh enumeration; nothing is cached between
    /// calls.
    fn list_section<'a>(&'a self, section: &'a str) -> RecordStream<'a>;

    /// Fetch one record. A deleted record yields `ProviderError::NotFound`.
    async fn fetch_by_id(&self, id: &RecordId) -> ProviderResult<CatalogRecord>;
}

/// Chat-style text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(
        &self,
        model: SupportedModel,
        system_prompt: &str,
        user_prompt: &str,
    ) -> ProviderResult<String>;
}
