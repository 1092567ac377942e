use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::ids::RecordId;

/// The kind of title a catalog record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
    Other,
}

impl MediaKind {
    /// Map a catalog type string (e.g. Plex `"movie"`, `"show"`).
    #[must_use]
    pub fn from_catalog_type(kind: &str) -> Self {
        match kind.to_lowercase().as_str() {
            "movie" => Self::Movie,
            "show" | "series" => Self::Show,
            _ => Self::Other,
        }
    }

    /// Noun phrase used in the title clause of a descriptor.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Movie => "a movie",
            Self::Show => "a TV show",
            Self::Other => "a title",
        }
    }
}

/// One movie or show as reported by the catalog.
///
/// An immutable snapshot taken at fetch time; nothing is persisted
/// locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: RecordId,
    pub kind: MediaKind,
    pub title: String,

    /// Year of first release.
    pub year: Option<i32>,

    #[serde(default)]
    pub genres: Vec<String>,

    /// Cast in billing order.
    #[serde(default)]
    pub cast: Vec<String>,

    #[serde(default)]
    pub directors: Vec<String>,

    /// Content rating (e.g. "PG-13", "TV-MA").
    pub content_rating: Option<String>,

    pub studio: Option<String>,

    /// Audience rating on a 0-10 scale.
    pub audience_rating: Option<f64>,

    /// Free-text synopsis.
    pub summary: Option<String>,
}

impl CatalogRecord {
    #[must_use]
    pub fn new(id: impl Into<RecordId>, kind: MediaKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            year: None,
            genres: Vec::new(),
            cast: Vec::new(),
            directors: Vec::new(),
            content_rating: None,
            studio: None,
            audience_rating: None,
            summary: None,
        }
    }

    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    #[must_use]
    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_cast<I, S>(mut self, cast: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cast = cast.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_directors<I, S>(mut self, directors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directors = directors.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_content_rating(mut self, rating: impl Into<String>) -> Self {
        self.content_rating = Some(rating.into());
        self
    }

    #[must_use]
    pub fn with_studio(mut self, studio: impl Into<String>) -> Self {
        self.studio = Some(studio.into());
        self
    }

    #[must_use]
    pub fn with_audience_rating(mut self, rating: f64) -> Self {
        self.audience_rating = Some(rating);
        self
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Check the fields every indexed record must carry.
    ///
    /// # Errors
    /// Returns [`Error::Data`] when the identifier or title is blank.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Data {
                id: String::from("<missing>"),
                reason: format!("record '{}' has no identifier", self.title),
            });
        }
        if self.title.trim().is_empty() {
            return Err(Error::Data {
                id: self.id.to_string(),
                reason: "record has no title".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_catalog_type() {
        assert_eq!(MediaKind::from_catalog_type("movie"), MediaKind::Movie);
        assert_eq!(MediaKind::from_catalog_type("Show"), MediaKind::Show);
        assert_eq!(MediaKind::from_catalog_type("artist"), MediaKind::Other);
    }

    #[test]
    fn test_record_builder() {
        let record = CatalogRecord::new("1", MediaKind::Movie, "Heat")
            .with_year(1995)
            .with_genres(["Crime", "Thriller"])
            .with_directors(["Michael Mann"]);
        assert_eq!(record.year, Some(1995));
        assert_eq!(record.genres, vec!["Crime", "Thriller"]);
        assert_eq!(record.directors, vec!["Michael Mann"]);
        assert!(record.cast.is_empty());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let record = CatalogRecord::new("9", MediaKind::Show, "   ");
        let err = record.validate().unwrap_err();
        assert!(matches!(err, Error::Data { ref id, .. } if id == "9"));
    }

    #[test]
    fn test_validate_rejects_missing_id() {
        let record = CatalogRecord::new("", MediaKind::Movie, "Alien");
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_minimal_record() {
        let record = CatalogRecord::new("3", MediaKind::Movie, "Alien");
        assert!(record.validate().is_ok());
    }
}
