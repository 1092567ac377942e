pub mod ids;
pub mod index;
pub mod record;
pub mod report;

pub use ids::RecordId;
pub use index::{EmbeddingVector, IndexEntry, IndexSpec, IndexStatus, Metric, RetrievalMatch};
pub use record::{CatalogRecord, MediaKind};
pub use report::{QueryResult, SyncReport};
