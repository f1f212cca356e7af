//! Processing Handler: runs one analysis through PROCESSING to COMPLETED or FAILED.
//!
//! Nothing here is returned to the submitter, who disconnected long ago. Every
//! failure is written into the record's `error_message` and is final: there are
//! no retries.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::inference::InferenceEngine;
use crate::storage::{
    get_text, BlobStore, InputKeys, StoreError, TrackingStore, Transition, TransitionOutcome,
};

/// How a processing run ended, for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed,
    Failed(String),
    /// Another run already moved the record to a terminal state; our write was rejected.
    Superseded { current: String },
    /// The terminal state could not be written; the record keeps its last state.
    Unrecorded { reason: String },
}

pub struct Processor {
    tracking: Arc<dyn TrackingStore>,
    blobs: Arc<dyn BlobStore>,
    engine: Arc<dyn InferenceEngine>,
}

impl Processor {
    pub fn new(
        tracking: Arc<dyn TrackingStore>,
        blobs: Arc<dyn BlobStore>,
        engine: Arc<dyn InferenceEngine>,
    ) -> Self {
        Self {
            tracking,
            blobs,
            engine,
        }
    }

    pub async fn process(&self, analysis_id: &str) -> ProcessOutcome {
        info!(analysis_id, engine = self.engine.name(), "Processing analysis");

        // Best effort: a failed or rejected PROCESSING update does not stop the run.
        match self
            .tracking
            .transition(analysis_id, Transition::StartProcessing { at: Utc::now() })
            .await
        {
            Ok(TransitionOutcome::Applied) => debug!(analysis_id, "Marked PROCESSING"),
            Ok(TransitionOutcome::Rejected { current }) => {
                warn!(analysis_id, %current, "Record not in SUBMITTED state; continuing")
            }
            Ok(TransitionOutcome::Missing) => {
                warn!(analysis_id, "No tracking record found; continuing")
            }
            Err(e) => warn!(analysis_id, "Failed to mark PROCESSING ({e}); continuing"),
        }

        let keys = self.input_keys(analysis_id).await;
        let (resume_text, job_description) = match self.read_inputs(&keys).await {
            Ok(inputs) => inputs,
            Err(e) => {
                return self
                    .fail(analysis_id, format!("Failed to retrieve input files: {e}"))
                    .await
            }
        };

        let output = match self.engine.analyze(&resume_text, &job_description).await {
            Ok(output) => output,
            Err(e) => return self.fail(analysis_id, format!("Inference error: {e}")).await,
        };

        let result = match serde_json::to_value(&output) {
            Ok(value) => value,
            Err(e) => {
                return self
                    .fail(analysis_id, format!("Failed to encode analysis result: {e}"))
                    .await
            }
        };

        let completion = self
            .tracking
            .transition(
                analysis_id,
                Transition::Complete {
                    at: Utc::now(),
                    result,
                },
            )
            .await;

        match completion {
            Ok(TransitionOutcome::Applied) => {
                info!(
                    analysis_id,
                    match_score = output.match_score,
                    is_mock = output.is_mock,
                    "Analysis completed"
                );
                ProcessOutcome::Completed
            }
            Ok(outcome) => self.not_recorded(analysis_id, outcome),
            Err(e) => {
                self.fail(analysis_id, format!("Failed to store analysis result: {e}"))
                    .await
            }
        }
    }

    /// Input locations from the record; the deterministic keys if it cannot be read.
    async fn input_keys(&self, analysis_id: &str) -> InputKeys {
        match self.tracking.get(analysis_id).await {
            Ok(Some(record)) => InputKeys {
                resume: record.resume_ref,
                job_description: record.job_description_ref,
            },
            Ok(None) => InputKeys::for_analysis(analysis_id),
            Err(e) => {
                warn!(analysis_id, "Could not read tracking record ({e}); using default keys");
                InputKeys::for_analysis(analysis_id)
            }
        }
    }

    async fn read_inputs(&self, keys: &InputKeys) -> Result<(String, String), StoreError> {
        let resume_text = get_text(self.blobs.as_ref(), &keys.resume).await?;
        let job_description = get_text(self.blobs.as_ref(), &keys.job_description).await?;
        Ok((resume_text, job_description))
    }

    async fn fail(&self, analysis_id: &str, message: String) -> ProcessOutcome {
        warn!(analysis_id, "Analysis failed: {message}");

        let outcome = self
            .tracking
            .transition(
                analysis_id,
                Transition::Fail {
                    at: Utc::now(),
                    message: message.clone(),
                },
            )
            .await;

        match outcome {
            Ok(TransitionOutcome::Applied) => ProcessOutcome::Failed(message),
            Ok(other) => self.not_recorded(analysis_id, other),
            Err(e) => {
                error!(analysis_id, "Could not record failure ({e}); record left as is");
                ProcessOutcome::Unrecorded { reason: message }
            }
        }
    }

    fn not_recorded(&self, analysis_id: &str, outcome: TransitionOutcome) -> ProcessOutcome {
        match outcome {
            TransitionOutcome::Rejected { current } => {
                warn!(
                    analysis_id,
                    %current,
                    "Terminal write rejected: duplicate processing race detected"
                );
                ProcessOutcome::Superseded { current }
            }
            TransitionOutcome::Missing => {
                error!(analysis_id, "Tracking record disappeared during processing");
                ProcessOutcome::Unrecorded {
                    reason: "tracking record not found".to_string(),
                }
            }
            TransitionOutcome::Applied => ProcessOutcome::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::inference::{InferenceError, KeywordOverlapAnalyzer};
    use crate::models::analysis::{AnalysisOutput, AnalysisRecord};
    use crate::storage::memory::{MemoryBlobStore, MemoryTrackingStore};

    struct FailingEngine;

    #[async_trait]
    impl InferenceEngine for FailingEngine {
        async fn analyze(&self, _: &str, _: &str) -> Result<AnalysisOutput, InferenceError> {
            Err(InferenceError::Unavailable("agent timed out".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct Fixture {
        tracking: Arc<MemoryTrackingStore>,
        blobs: Arc<MemoryBlobStore>,
    }

    impl Fixture {
        async fn submitted(analysis_id: &str) -> Self {
            let tracking = Arc::new(MemoryTrackingStore::new());
            let blobs = Arc::new(MemoryBlobStore::new());
            let keys = InputKeys::for_analysis(analysis_id);
            blobs
                .put_text(&keys.resume, "Python AWS microservices experience")
                .await
                .unwrap();
            blobs
                .put_text(&keys.job_description, "Python AWS microservices required")
                .await
                .unwrap();
            tracking
                .create(&AnalysisRecord::submitted(
                    analysis_id,
                    keys.resume,
                    keys.job_description,
                    Utc::now(),
                ))
                .await
                .unwrap();
            Self { tracking, blobs }
        }

        fn processor(&self, engine: Arc<dyn InferenceEngine>) -> Processor {
            Processor::new(self.tracking.clone(), self.blobs.clone(), engine)
        }

        async fn record(&self, analysis_id: &str) -> AnalysisRecord {
            self.tracking.get(analysis_id).await.unwrap().unwrap()
        }
    }

    #[tokio::test]
    async fn test_completes_with_fallback_analysis() {
        let fx = Fixture::submitted("a1").await;
        let outcome = fx.processor(Arc::new(KeywordOverlapAnalyzer)).process("a1").await;
        assert_eq!(outcome, ProcessOutcome::Completed);

        let record = fx.record("a1").await;
        assert_eq!(record.status, "COMPLETED");
        assert!(record.processing_timestamp.is_some());
        assert!(record.completion_timestamp.is_some());
        assert!(record.error_message.is_none());
        let result = record.analysis_result.unwrap();
        assert_eq!(result["match_score"], 15);
        assert_eq!(result["is_mock"], true);
    }

    #[tokio::test]
    async fn test_missing_input_marks_failed() {
        let fx = Fixture::submitted("a2").await;
        fx.blobs
            .remove(&InputKeys::for_analysis("a2").job_description)
            .await;

        let outcome = fx.processor(Arc::new(KeywordOverlapAnalyzer)).process("a2").await;
        assert!(matches!(outcome, ProcessOutcome::Failed(_)));

        let record = fx.record("a2").await;
        assert_eq!(record.status, "FAILED");
        assert!(record
            .error_message
            .unwrap()
            .starts_with("Failed to retrieve input files"));
        assert!(record.analysis_result.is_none());
    }

    #[tokio::test]
    async fn test_inference_error_marks_failed() {
        let fx = Fixture::submitted("a3").await;
        let outcome = fx.processor(Arc::new(FailingEngine)).process("a3").await;
        assert_eq!(
            outcome,
            ProcessOutcome::Failed(
                "Inference error: inference engine unavailable: agent timed out".to_string()
            )
        );
        assert_eq!(fx.record("a3").await.status, "FAILED");
    }

    #[tokio::test]
    async fn test_failed_processing_update_does_not_abort() {
        let fx = Fixture::submitted("a4").await;
        fx.tracking.fail_next_transitions(1);

        let outcome = fx.processor(Arc::new(KeywordOverlapAnalyzer)).process("a4").await;
        assert_eq!(outcome, ProcessOutcome::Completed);

        let record = fx.record("a4").await;
        assert_eq!(record.status, "COMPLETED");
        assert!(record.processing_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_unwritable_terminal_state_leaves_last_state() {
        let fx = Fixture::submitted("a5").await;
        fx.tracking.fail_next_transitions(usize::MAX);

        let outcome = fx.processor(Arc::new(KeywordOverlapAnalyzer)).process("a5").await;
        assert!(matches!(outcome, ProcessOutcome::Unrecorded { .. }));
        assert_eq!(fx.record("a5").await.status, "SUBMITTED");
    }

    #[tokio::test]
    async fn test_second_run_cannot_rewrite_completed_record() {
        let fx = Fixture::submitted("a6").await;
        let processor = fx.processor(Arc::new(KeywordOverlapAnalyzer));

        assert_eq!(processor.process("a6").await, ProcessOutcome::Completed);
        let first = fx.record("a6").await;

        let again = processor.process("a6").await;
        assert_eq!(
            again,
            ProcessOutcome::Superseded {
                current: "COMPLETED".to_string()
            }
        );
        let after = fx.record("a6").await;
        assert_eq!(after.status, "COMPLETED");
        assert_eq!(after.analysis_result, first.analysis_result);
        assert_eq!(after.completion_timestamp, first.completion_timestamp);
    }

    #[tokio::test]
    async fn test_racing_runs_complete_exactly_once() {
        let fx = Fixture::submitted("a7").await;
        let processor = Arc::new(fx.processor(Arc::new(KeywordOverlapAnalyzer)));

        let runs = (0..4).map(|_| {
            let processor = processor.clone();
            tokio::spawn(async move { processor.process("a7").await })
        });
        let mut outcomes = Vec::new();
        for run in runs.collect::<Vec<_>>() {
            outcomes.push(run.await.unwrap());
        }

        let completed = outcomes
            .iter()
            .filter(|o| **o == ProcessOutcome::Completed)
            .count();
        assert_eq!(completed, 1, "outcomes: {outcomes:?}");
        assert!(outcomes
            .iter()
            .filter(|o| **o != ProcessOutcome::Completed)
            .all(|o| matches!(o, ProcessOutcome::Superseded { .. })));
        assert_eq!(fx.record("a7").await.status, "COMPLETED");
    }
}
