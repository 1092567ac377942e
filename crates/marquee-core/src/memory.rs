//! In-memory vector index.
//!
//! [`InMemoryIndex`] keeps every index in a `HashMap` behind a
//! `tokio::sync::RwLock` and scores queries by brute force. It backs
//! `marquee serve --in-memory` for local runs and the pipeline tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Provider, ProviderError, ProviderResult};
use crate::model::{EmbeddingVector, IndexEntry, IndexSpec, Metric, RecordId, RetrievalMatch};
use crate::provider::VectorIndex;

#[derive(Debug)]
struct StoredIndex {
    spec: IndexSpec,
    entries: HashMap<RecordId, EmbeddingVector>,
}

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    indexes: RwLock<HashMap<String, StoredIndex>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `index`, or `None` if it does not exist.
    pub async fn entry_count(&self, index: &str) -> Option<usize> {
        self.indexes.read().await.get(index).map(|i| i.entries.len())
    }

    /// Stored vector for `id`, if any.
    pub async fn get(&self, index: &str, id: &RecordId) -> Option<EmbeddingVector> {
        self.indexes
            .read()
            .await
            .get(index)
            .and_then(|i| i.entries.get(id).cloned())
    }
}

fn missing(index: &str) -> ProviderError {
    ProviderError::NotFound {
        provider: Provider::VectorIndex,
        entity: format!("index '{index}'"),
    }
}

fn score(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match metric {
        Metric::DotProduct => dot,
        Metric::Euclidean => {
            let dist: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt();
            -dist
        }
        Metric::Cosine => {
            let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                return 0.0;
            }
            dot / (norm_a * norm_b)
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn describe_index(&self, name: &str) -> ProviderResult<Option<IndexSpec>> {
        Ok(self.indexes.read().await.get(name).map(|i| i.spec.clone()))
    }

    async fn create_index(&self, spec: &IndexSpec) -> ProviderResult<()> {
        let mut indexes = self.indexes.write().await;
        indexes
            .entry(spec.name.clone())
            .or_insert_with(|| StoredIndex {
                spec: spec.clone(),
                entries: HashMap::new(),
            });
        Ok(())
    }

    async fn upsert(&self, index: &str, entries: &[IndexEntry]) -> ProviderResult<()> {
        let mut indexes = self.indexes.write().await;
        let stored = indexes.get_mut(index).ok_or_else(|| missing(index))?;

        // Reject the whole batch before writing anything.
        if let Some(bad) = entries
            .iter()
            .find(|e| e.vector.dimension() != stored.spec.dimension)
        {
            return Err(ProviderError::Rejected {
                provider: Provider::VectorIndex,
                message: format!(
                    "vector for {} has dimension {}, index '{}' expects {}",
                    bad.id,
                    bad.vector.dimension(),
                    index,
                    stored.spec.dimension
                ),
            });
        }

        for entry in entries {
            stored.entries.insert(entry.id.clone(), entry.vector.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        index: &str,
        vector: &EmbeddingVector,
        top_k: usize,
    ) -> ProviderResult<Vec<RetrievalMatch>> {
        let indexes = self.indexes.read().await;
        let stored = indexes.get(index).ok_or_else(|| missing(index))?;

        let mut matches: Vec<RetrievalMatch> = stored
            .entries
            .iter()
            .map(|(id, candidate)| RetrievalMatch {
                id: id.clone(),
                score: score(stored.spec.metric, candidate.as_slice(), vector.as_slice()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, index: &str, ids: &[RecordId]) -> ProviderResult<()> {
        let mut indexes = self.indexes.write().await;
        let stored = indexes.get_mut(index).ok_or_else(|| missing(index))?;
        for id in ids {
            stored.entries.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::IndexStatus;

    fn spec() -> IndexSpec {
        IndexSpec::new("media", 3, Metric::Cosine)
    }

    fn entry(id: &str, values: [f32; 3]) -> IndexEntry {
        IndexEntry::new(RecordId::new(id), EmbeddingVector::new(values.to_vec()))
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let index = InMemoryIndex::new();
        assert_eq!(index.ensure_index(&spec()).await.unwrap(), IndexStatus::Created);
        assert_eq!(index.ensure_index(&spec()).await.unwrap(), IndexStatus::Existing);
    }

    #[tokio::test]
    async fn test_ensure_index_dimension_mismatch_is_not_destructive() {
        let index = InMemoryIndex::new();
        index.ensure_index(&spec()).await.unwrap();
        index.upsert("media", &[entry("1", [1.0, 0.0, 0.0])]).await.unwrap();

        let wider = IndexSpec::new("media", 4, Metric::Cosine);
        let err = index.ensure_index(&wider).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3, .. }));
        assert!(err.is_config());

        assert_eq!(index.describe_index("media").await.unwrap(), Some(spec()));
        assert_eq!(index.entry_count("media").await, Some(1));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let index = InMemoryIndex::new();
        index.create_index(&spec()).await.unwrap();
        index.upsert("media", &[entry("1", [1.0, 0.0, 0.0])]).await.unwrap();
        index.upsert("media", &[entry("1", [0.0, 1.0, 0.0])]).await.unwrap();

        assert_eq!(index.entry_count("media").await, Some(1));
        let stored = index.get("media", &RecordId::new("1")).await.unwrap();
        assert_eq!(stored.as_slice(), &[0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_whole_batch_on_bad_dimension() {
        let index = InMemoryIndex::new();
        index.create_index(&spec()).await.unwrap();
        let bad = IndexEntry::new(RecordId::new("2"), EmbeddingVector::new(vec![1.0]));
        let result = index
            .upsert("media", &[entry("1", [1.0, 0.0, 0.0]), bad])
            .await;
        assert!(result.is_err());
        assert_eq!(index.entry_count("media").await, Some(0));
    }

    #[tokio::test]
    async fn test_query_orders_by_descending_similarity() {
        let index = InMemoryIndex::new();
        index.create_index(&spec()).await.unwrap();
        index
            .upsert(
                "media",
                &[
                    entry("far", [0.0, 0.0, 1.0]),
                    entry("near", [1.0, 0.1, 0.0]),
                    entry("mid", [1.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let query = EmbeddingVector::new(vec![1.0, 0.0, 0.0]);
        let matches = index.query("media", &query, 2).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(matches[0].score >= matches[1].score);
    }

    #[tokio::test]
    async fn test_delete_removes_entries() {
        let index = InMemoryIndex::new();
        index.create_index(&spec()).await.unwrap();
        index
            .upsert("media", &[entry("1", [1.0, 0.0, 0.0]), entry("2", [0.0, 1.0, 0.0])])
            .await
            .unwrap();
        index
            .delete("media", &[RecordId::new("1"), RecordId::new("missing")])
            .await
            .unwrap();
        assert_eq!(index.entry_count("media").await, Some(1));
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let index = InMemoryIndex::new();
        let err = index
            .query("nope", &EmbeddingVector::new(vec![1.0]), 5)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
