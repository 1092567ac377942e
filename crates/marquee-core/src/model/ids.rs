use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a catalog record, unique within one library.
///
/// The catalog owns the value (for Plex this is the `ratingKey`); the
/// same identifier keys the record's entry in the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_display() {
        let id = RecordId::new("12345");
        assert_eq!(id.to_string(), "12345");
        assert_eq!(id.as_str(), "12345");
    }

    #[test]
    fn test_record_id_blank_is_empty() {
        assert!(RecordId::new("  ").is_empty());
        assert!(!RecordId::from("7").is_empty());
    }

    #[test]
    fn test_record_id_serializes_transparently() {
        let id = RecordId::new("abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
