//! Core domain model for marquee.
//!
//! This crate defines the catalog record model, the deterministic
//! descriptor builder that turns records into embedding input, the
//! provider contracts (embedding, vector index, catalog, generation),
//! retry policy, and the error taxonomy shared by the ingestion and
//! query pipelines.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod descriptor;
pub mod error;
pub mod llm;
pub mod memory;
pub mod model;
pub mod provider;
pub mod retry;
pub mod text;

pub use descriptor::{Descriptor, DescriptorMode, RatingBucket};
pub use error::{Error, Provider, ProviderError, ProviderResult, Result};
pub use llm::SupportedModel;
pub use memory::InMemoryIndex;
pub use model::{
    CatalogRecord, EmbeddingVector, IndexEntry, IndexSpec, IndexStatus, MediaKind, Metric,
    QueryResult, RecordId, RetrievalMatch, SyncReport,
};
pub use provider::{CatalogSource, Embedder, Generator, RecordStream, VectorIndex};
pub use retry::RetryPolicy;
