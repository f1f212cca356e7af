//! Storage seams: the tracking record store and the blob store.
//!
//! Handlers only see the two traits. Production wiring uses PostgreSQL and S3;
//! the in-memory implementations back the tests and local runs.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::models::analysis::{AnalysisRecord, AnalysisStatus};

pub mod memory;
pub mod postgres;
pub mod s3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("tracking store error: {0}")]
    Tracking(String),

    #[error("blob store error: {0}")]
    Blob(String),

    #[error("record {0} already exists")]
    AlreadyExists(String),

    #[error("blob {0} not found")]
    BlobNotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Tracking(e.to_string())
    }
}

/// Blob keys for the two raw inputs of an analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputKeys {
    pub resume: String,
    pub job_description: String,
}

impl InputKeys {
    pub fn for_analysis(analysis_id: &str) -> Self {
        Self {
            resume: format!("raw-inputs/{analysis_id}/resume.txt"),
            job_description: format!("raw-inputs/{analysis_id}/job_description.txt"),
        }
    }
}

/// A single status change applied to a tracking record.
#[derive(Debug, Clone)]
pub enum Transition {
    StartProcessing { at: DateTime<Utc> },
    Complete { at: DateTime<Utc>, result: Value },
    Fail { at: DateTime<Utc>, message: String },
}

impl Transition {
    pub fn target(&self) -> AnalysisStatus {
        match self {
            Transition::StartProcessing { .. } => AnalysisStatus::Processing,
            Transition::Complete { .. } => AnalysisStatus::Completed,
            Transition::Fail { .. } => AnalysisStatus::Failed,
        }
    }

    /// States the record must be in for this transition to apply.
    /// Terminal states never appear here.
    pub fn allowed_from(&self) -> &'static [AnalysisStatus] {
        match self {
            Transition::StartProcessing { .. } => &[AnalysisStatus::Submitted],
            Transition::Complete { .. } | Transition::Fail { .. } => {
                &[AnalysisStatus::Submitted, AnalysisStatus::Processing]
            }
        }
    }

    pub fn permits(&self, current: &str) -> bool {
        AnalysisStatus::parse(current)
            .map(|status| !status.is_terminal() && self.allowed_from().contains(&status))
            .unwrap_or(false)
    }

    /// Applies the field changes to an in-memory record. Callers check `permits` first.
    pub fn apply_to(&self, record: &mut AnalysisRecord) {
        record.status = self.target().to_string();
        match self {
            Transition::StartProcessing { at } => record.processing_timestamp = Some(*at),
            Transition::Complete { at, result } => {
                record.completion_timestamp = Some(*at);
                record.analysis_result = Some(result.clone());
                record.error_message = None;
            }
            Transition::Fail { at, message } => {
                record.completion_timestamp = Some(*at);
                record.error_message = Some(message.clone());
                record.analysis_result = None;
            }
        }
    }
}

/// Result of a conditional status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// The record was in a state the transition may not leave.
    Rejected { current: String },
    Missing,
}

#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Inserts a new record. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, record: &AnalysisRecord) -> Result<(), StoreError>;

    async fn get(&self, analysis_id: &str) -> Result<Option<AnalysisRecord>, StoreError>;

    /// Applies `transition` only if the record's current status permits it.
    async fn transition(
        &self,
        analysis_id: &str,
        transition: Transition,
    ) -> Result<TransitionOutcome, StoreError>;

    /// Connectivity check used by `GET /health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_text(&self, key: &str, body: &str) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Connectivity check used by `GET /health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Reads a blob and decodes it as UTF-8 text.
pub async fn get_text(blobs: &dyn BlobStore, key: &str) -> Result<String, StoreError> {
    let bytes = blobs.get(key).await?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| StoreError::Blob(format!("{key} is not valid UTF-8: {e}")))
}
