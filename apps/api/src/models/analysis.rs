use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Lifecycle of an analysis: SUBMITTED → PROCESSING → {COMPLETED, FAILED}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Submitted => "SUBMITTED",
            AnalysisStatus::Processing => "PROCESSING",
            AnalysisStatus::Completed => "COMPLETED",
            AnalysisStatus::Failed => "FAILED",
        }
    }

    /// Parses a stored status. Returns `None` for values written by something
    /// other than this service.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUBMITTED" => Some(AnalysisStatus::Submitted),
            "PROCESSING" => Some(AnalysisStatus::Processing),
            "COMPLETED" => Some(AnalysisStatus::Completed),
            "FAILED" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the tracking store, keyed by `analysis_id`.
///
/// `status` is kept as raw text so that unexpected values survive a read and
/// can be reported as `unknown` instead of failing the request.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub status: String,
    #[sqlx(rename = "submitted_at")]
    pub timestamp: DateTime<Utc>,
    pub resume_ref: String,
    pub job_description_ref: String,
    pub processing_timestamp: Option<DateTime<Utc>>,
    pub completion_timestamp: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Raw inference output, stored as produced. Shape is checked on read.
    pub analysis_result: Option<Value>,
}

impl AnalysisRecord {
    pub fn submitted(
        analysis_id: &str,
        resume_ref: String,
        job_description_ref: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            analysis_id: analysis_id.to_string(),
            status: AnalysisStatus::Submitted.as_str().to_string(),
            timestamp: now,
            resume_ref,
            job_description_ref,
            processing_timestamp: None,
            completion_timestamp: None,
            error_message: None,
            analysis_result: None,
        }
    }

    pub fn parsed_status(&self) -> Option<AnalysisStatus> {
        AnalysisStatus::parse(&self.status)
    }
}

/// Gap and advice lists returned directly by an engine that emits structured output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredInsights {
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// What an inference engine produces and what gets persisted as `analysis_result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub match_score: u32,
    pub analysis: String,
    pub timestamp: DateTime<Utc>,
    pub is_mock: bool,
    #[serde(flatten)]
    pub insights: Option<StructuredInsights>,
}
