//! Natural-language descriptors for catalog records.
//!
//! A descriptor is the text that gets embedded at ingestion time and the
//! text handed to the generation model as grounding at query time. It is
//! a pure function of the record: clauses are appended in a fixed order
//! and a clause is included only when its source field is present.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::CatalogRecord;
use crate::text::{join_natural, normalize_whitespace};

/// Cast members beyond this many are left out of the cast clause.
pub const MAX_CAST: usize = 5;

/// Which pipeline a descriptor is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorMode {
    /// Embedding input: includes directors and studio.
    Ingestion,
    /// Grounding text: omits directors and studio, prints the numeric
    /// audience rating next to its bucket.
    Query,
}

/// Coarse sentiment label for a 0-10 audience rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingBucket {
    High,
    Moderate,
    Low,
}

impl RatingBucket {
    /// `>= 8` is high, `>= 5` moderate, anything else low.
    #[must_use]
    pub fn from_rating(rating: f64) -> Self {
        if rating >= 8.0 {
            Self::High
        } else if rating >= 5.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "highly rated",
            Self::Moderate => "moderately rated",
            Self::Low => "low rated",
        }
    }
}

/// Generated description of one catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(String);

impl Descriptor {
    /// Build the descriptor for `record`.
    ///
    /// Never fails. A record without a title yields an empty descriptor,
    /// which callers must skip rather than embed.
    #[must_use]
    pub fn build(record: &CatalogRecord, mode: DescriptorMode) -> Self {
        let title = record.title.trim();
        if title.is_empty() {
            return Self(String::new());
        }

        let mut clauses = vec![format!("{title} is {}", record.kind.marker())];

        if let Some(year) = record.year {
            clauses.push(format!("released in {year}"));
        }

        let genres = non_blank(&record.genres);
        match genres.len() {
            0 => {}
            1 => clauses.push(format!("in the {} genre", genres[0])),
            _ => clauses.push(format!("in the {} genres", join_natural(&genres))),
        }

        let cast = non_blank(&record.cast);
        if !cast.is_empty() {
            let billed = &cast[..cast.len().min(MAX_CAST)];
            clauses.push(format!("starring {}", join_natural(billed)));
        }

        if mode == DescriptorMode::Ingestion {
            let directors = non_blank(&record.directors);
            if !directors.is_empty() {
                clauses.push(format!("directed by {}", join_natural(&directors)));
            }
        }

        if let Some(rating) = present(record.content_rating.as_deref()) {
            clauses.push(format!("rated {rating}"));
        }

        if mode == DescriptorMode::Ingestion {
            if let Some(studio) = present(record.studio.as_deref()) {
                clauses.push(format!("produced by {studio}"));
            }
        }

        if let Some(rating) = record.audience_rating {
            let label = RatingBucket::from_rating(rating).label();
            match mode {
                DescriptorMode::Ingestion => clauses.push(label.to_string()),
                DescriptorMode::Query => clauses.push(format!("{label} ({rating:.1}/10)")),
            }
        }

        if let Some(summary) = record.summary.as_deref() {
            let summary = normalize_whitespace(summary);
            if !summary.is_empty() {
                clauses.push(format!("summary: {summary}"));
            }
        }

        Self(clauses.join(", "))
    }

    #[must_use]
    pub fn for_ingestion(record: &CatalogRecord) -> Self {
        Self::build(record, DescriptorMode::Ingestion)
    }

    #[must_use]
    pub fn for_query(record: &CatalogRecord) -> Self {
        Self::build(record, DescriptorMode::Query)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Descriptor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn non_blank(values: &[String]) -> Vec<&str> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect()
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
