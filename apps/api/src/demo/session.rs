use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::formatter::FormattedResult;

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub analysis_id: String,
    pub recorded_at: DateTime<Utc>,
    pub results: FormattedResult,
}

/// Per-run client state: the most recent completed analyses, oldest first.
#[derive(Debug, Default)]
pub struct Session {
    history: VecDeque<HistoryEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a completed analysis, evicting the oldest beyond `HISTORY_LIMIT`.
    pub fn record(&mut self, analysis_id: &str, results: FormattedResult, at: DateTime<Utc>) {
        self.history.push_back(HistoryEntry {
            analysis_id: analysis_id.to_string(),
            recorded_at: at,
            results,
        });
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// History as a pretty-printed JSON array, oldest first.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(score: u32) -> FormattedResult {
        FormattedResult {
            match_score: score,
            missing_skills: Vec::new(),
            recommendations: Vec::new(),
            confidence_score: 50,
            analysis_timestamp: "2025-01-15T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_history_keeps_last_ten_in_order() {
        let mut session = Session::new();
        for i in 0..12 {
            session.record(&format!("id-{i}"), results(i), Utc::now());
        }

        assert_eq!(session.len(), HISTORY_LIMIT);
        let ids: Vec<_> = session.history().map(|e| e.analysis_id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"id-2"));
        assert_eq!(ids.last(), Some(&"id-11"));
        assert_eq!(session.latest().unwrap().results.match_score, 11);
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(session.is_empty());
        assert!(session.latest().is_none());
    }

    #[test]
    fn test_history_exports_as_json_array() {
        let mut session = Session::new();
        session.record("first", results(40), Utc::now());
        session.record("second", results(75), Utc::now());

        let exported: serde_json::Value =
            serde_json::from_str(&session.to_json_pretty().unwrap()).unwrap();
        let entries = exported.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["analysis_id"], "first");
        assert_eq!(entries[1]["results"]["match_score"], 75);
        assert!(entries[1]["recorded_at"].is_string());
    }
}
