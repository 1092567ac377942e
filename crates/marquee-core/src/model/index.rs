use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::ids::RecordId;

/// Similarity metric of a vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    #[serde(rename = "dotproduct")]
    DotProduct,
}

impl Metric {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dotproduct" | "dot_product" => Ok(Self::DotProduct),
            other => Err(Error::Config(format!("unknown index metric '{other}'"))),
        }
    }
}

/// Name, dimensionality, and metric of the vector index.
///
/// Both pipelines must be handed the same spec; it is built once from
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
}

impl IndexSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: usize, metric: Metric) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric,
        }
    }

    /// Compare an existing index against this spec.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] when the dimensionality
    /// differs and [`Error::Config`] when the metric differs.
    pub fn check_compatible(&self, existing: &IndexSpec) -> Result<()> {
        if existing.dimension != self.dimension {
            return Err(Error::DimensionMismatch {
                context: format!("index '{}'", self.name),
                expected: self.dimension,
                actual: existing.dimension,
            });
        }
        if existing.metric != self.metric {
            return Err(Error::Config(format!(
                "index '{}' uses metric {}, expected {}",
                self.name, existing.metric, self.metric
            )));
        }
        Ok(())
    }
}

/// Outcome of an idempotent ensure-index call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Created,
    Existing,
}

/// Fixed-length embedding produced by the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    #[must_use]
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Fail unless the vector has exactly `expected` components.
    ///
    /// Vectors are never truncated or padded.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] naming `context`.
    pub fn check_dimension(&self, expected: usize, context: impl Into<String>) -> Result<()> {
        if self.dimension() == expected {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                context: context.into(),
                expected,
                actual: self.dimension(),
            })
        }
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// An embedding keyed by the record it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: RecordId,
    pub vector: EmbeddingVector,
}

impl IndexEntry {
    #[must_use]
    pub fn new(id: RecordId, vector: EmbeddingVector) -> Self {
        Self { id, vector }
    }
}

/// One nearest-neighbour hit. Higher scores are more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub id: RecordId,
    pub score: f32,
}

impl RetrievalMatch {
    #[must_use]
    pub fn new(id: impl Into<RecordId>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_round_trip_names() {
        assert_eq!("cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("DotProduct".parse::<Metric>().unwrap(), Metric::DotProduct);
        assert!("manhattan".parse::<Metric>().is_err());
        assert_eq!(Metric::DotProduct.to_string(), "dotproduct");
    }

    #[test]
    fn test_check_dimension_rejects_mismatch() {
        let vector = EmbeddingVector::new(vec![0.1, 0.2, 0.3]);
        assert!(vector.check_dimension(3, "query").is_ok());
        let err = vector.check_dimension(4, "query").unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_spec_compatibility() {
        let spec = IndexSpec::new("media", 1536, Metric::Cosine);
        assert!(spec.check_compatible(&spec.clone()).is_ok());

        let smaller = IndexSpec::new("media", 768, Metric::Cosine);
        assert!(matches!(
            spec.check_compatible(&smaller),
            Err(Error::DimensionMismatch { actual: 768, .. })
        ));

        let euclid = IndexSpec::new("media", 1536, Metric::Euclidean);
        assert!(matches!(spec.check_compatible(&euclid), Err(Error::Config(_))));
    }
}
