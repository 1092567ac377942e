use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::index::RetrievalMatch;

/// Counters for one sync run over one catalog section.
///
/// `items_processed` counts records whose entries were confirmed
/// upserted; records still waiting in an unflushed batch are in neither
/// counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub section: String,
    pub items_processed: usize,
    pub items_skipped: usize,
    pub batches_upserted: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    #[must_use]
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            section: section.into(),
            items_processed: 0,
            items_skipped: 0,
            batches_upserted: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

/// Answer text plus the ranked matches that grounded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub matches: Vec<RetrievalMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_is_empty() {
        let report = SyncReport::new("Movies");
        assert_eq!(report.section, "Movies");
        assert_eq!(report.items_processed, 0);
        assert_eq!(report.items_skipped, 0);
        assert_eq!(report.batches_upserted, 0);
        assert!(report.finished_at.is_none());
    }

    #[test]
    fn test_finish_sets_timestamp() {
        let mut report = SyncReport::new("TV Shows");
        report.finish();
        let finished = report.finished_at.unwrap();
        assert!(finished >= report.started_at);
    }

    #[test]
    fn test_report_serializes_counters() {
        let report = SyncReport::new("Movies");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["section"], "Movies");
        assert_eq!(json["items_processed"], 0);
    }
}
