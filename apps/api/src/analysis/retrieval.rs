//! Retrieval Handler: maps a tracking record to the client-facing view.

use serde::{Deserialize, Serialize};

use crate::analysis::formatter::{format_analysis_result, FormattedResult};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisRecord, AnalysisStatus};
use crate::storage::TrackingStore;

const QUEUED_MESSAGE: &str = "Analysis is queued for processing";
const RUNNING_MESSAGE: &str = "Analysis is currently being processed";
const DEFAULT_FAILURE: &str = "Analysis failed";

/// Body of `GET /results/{analysis_id}`. The `status` tag is what clients branch on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RetrievalResponse {
    Processing { message: String },
    Completed { results: FormattedResult },
    Failed { error: String, timestamp: String },
    Unknown { message: String },
}

pub async fn get_analysis(
    tracking: &dyn TrackingStore,
    analysis_id: &str,
) -> Result<RetrievalResponse, AppError> {
    if analysis_id.trim().is_empty() {
        return Err(AppError::Validation("analysis_id is required".to_string()));
    }

    let record = tracking
        .get(analysis_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))?;

    Ok(to_response(&record))
}

/// Pure mapping from a stored record; no store access and no clock reads.
pub fn to_response(record: &AnalysisRecord) -> RetrievalResponse {
    let last_change = record
        .completion_timestamp
        .unwrap_or(record.timestamp)
        .to_rfc3339();

    match record.parsed_status() {
        Some(AnalysisStatus::Submitted) => RetrievalResponse::Processing {
            message: QUEUED_MESSAGE.to_string(),
        },
        Some(AnalysisStatus::Processing) => RetrievalResponse::Processing {
            message: RUNNING_MESSAGE.to_string(),
        },
        Some(AnalysisStatus::Completed) => {
            let stored = record
                .analysis_result
                .clone()
                .unwrap_or(serde_json::Value::Null);
            RetrievalResponse::Completed {
                results: format_analysis_result(&stored, &last_change),
            }
        }
        Some(AnalysisStatus::Failed) => RetrievalResponse::Failed {
            error: record
                .error_message
                .clone()
                .unwrap_or_else(|| DEFAULT_FAILURE.to_string()),
            timestamp: last_change,
        },
        None => RetrievalResponse::Unknown {
            message: format!("Unknown status: {}", record.status),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use crate::storage::memory::MemoryTrackingStore;

    fn record(status: &str) -> AnalysisRecord {
        let submitted_at = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let mut record =
            AnalysisRecord::submitted("r1", "r".to_string(), "j".to_string(), submitted_at);
        record.status = status.to_string();
        record
    }

    #[test]
    fn test_pending_states_report_processing() {
        assert_eq!(
            to_response(&record("SUBMITTED")),
            RetrievalResponse::Processing {
                message: "Analysis is queued for processing".to_string()
            }
        );
        assert_eq!(
            to_response(&record("PROCESSING")),
            RetrievalResponse::Processing {
                message: "Analysis is currently being processed".to_string()
            }
        );
    }

    #[test]
    fn test_failed_without_message_uses_default_and_creation_time() {
        let failed = record("FAILED");
        let expected_timestamp = failed.timestamp.to_rfc3339();
        assert_eq!(
            to_response(&failed),
            RetrievalResponse::Failed {
                error: "Analysis failed".to_string(),
                timestamp: expected_timestamp,
            }
        );
    }

    #[test]
    fn test_failed_prefers_completion_time() {
        let mut failed = record("FAILED");
        let finished = failed.timestamp + Duration::seconds(12);
        failed.completion_timestamp = Some(finished);
        failed.error_message = Some("Inference error: timeout".to_string());

        match to_response(&failed) {
            RetrievalResponse::Failed { error, timestamp } => {
                assert_eq!(error, "Inference error: timeout");
                assert_eq!(timestamp, finished.to_rfc3339());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_completed_record_is_formatted() {
        let mut done = record("COMPLETED");
        done.analysis_result = Some(json!({
            "match_score": 82,
            "analysis": "Strong overlap.",
            "timestamp": "2025-01-15T10:00:05Z",
            "is_mock": false,
            "missing_skills": ["Kubernetes"],
            "recommendations": ["Quantify the impact of the payments migration"]
        }));

        match to_response(&done) {
            RetrievalResponse::Completed { results } => {
                assert_eq!(results.match_score, 82);
                assert_eq!(results.missing_skills, vec!["Kubernetes"]);
                assert_eq!(results.analysis_timestamp, "2025-01-15T10:00:05Z");
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_unrecognised_status_is_reported() {
        let json = serde_json::to_value(to_response(&record("ARCHIVED"))).unwrap();
        assert_eq!(json["status"], "unknown");
        assert_eq!(json["message"], "Unknown status: ARCHIVED");
    }

    #[test]
    fn test_status_tag_is_lowercase_on_the_wire() {
        let json = serde_json::to_value(to_response(&record("SUBMITTED"))).unwrap();
        assert_eq!(json["status"], "processing");
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = MemoryTrackingStore::new();
        let err = get_analysis(&store, "never-submitted").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stored_foreign_status_is_retrieved_as_unknown() {
        let store = MemoryTrackingStore::new();
        store.insert_raw(record("ARCHIVED")).await;

        assert_eq!(
            get_analysis(&store, "r1").await.unwrap(),
            RetrievalResponse::Unknown {
                message: "Unknown status: ARCHIVED".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_blank_id_is_invalid() {
        let store = MemoryTrackingStore::new();
        let err = get_analysis(&store, "  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
