//! Submission Handler: validate, store both inputs, create the record, hand off.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::dispatch::ProcessingDispatcher;
use crate::errors::AppError;
use crate::models::analysis::AnalysisRecord;
use crate::storage::{
    BlobStore, InputKeys, StoreError, TrackingStore, Transition, TransitionOutcome,
};

const MAX_ANALYSIS_ID_LEN: usize = 128;

/// Fields are optional so that a missing field is reported as a validation
/// error rather than a body-parsing failure.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    pub analysis_id: String,
    pub estimated_completion: DateTime<Utc>,
}

/// Borrowed view of a request that passed validation.
#[derive(Debug)]
pub struct ValidSubmission<'a> {
    pub analysis_id: &'a str,
    pub resume_text: &'a str,
    pub job_description: &'a str,
}

pub fn validate(request: &SubmitRequest) -> Result<ValidSubmission<'_>, AppError> {
    let analysis_id = required(&request.analysis_id, "analysis_id")?;
    let resume_text = required(&request.resume_text, "resume_text")?;
    let job_description = required(&request.job_description, "job_description")?;

    if !analysis_id.chars().all(is_id_char) {
        return Err(AppError::Validation(
            "analysis_id may only contain letters, digits, '-', '_' and '.'".to_string(),
        ));
    }
    if analysis_id.chars().count() > MAX_ANALYSIS_ID_LEN {
        return Err(AppError::Validation(format!(
            "analysis_id must be at most {MAX_ANALYSIS_ID_LEN} characters"
        )));
    }

    Ok(ValidSubmission {
        analysis_id,
        resume_text,
        job_description,
    })
}

/// Ids become a blob key segment and a URL path segment, so only characters
/// that need no escaping in either are accepted.
fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

/// Runs a submission end to end. Writes are not rolled back if a later step fails.
pub async fn submit_analysis(
    tracking: &dyn TrackingStore,
    blobs: &dyn BlobStore,
    dispatcher: &dyn ProcessingDispatcher,
    request: &SubmitRequest,
    estimated_completion_secs: i64,
) -> Result<SubmitResponse, AppError> {
    let submission = validate(request)?;
    let analysis_id = submission.analysis_id;

    if tracking.get(analysis_id).await?.is_some() {
        return Err(duplicate_id(analysis_id));
    }

    let keys = InputKeys::for_analysis(analysis_id);
    blobs.put_text(&keys.resume, submission.resume_text).await?;
    blobs
        .put_text(&keys.job_description, submission.job_description)
        .await?;

    let now = Utc::now();
    let record = AnalysisRecord::submitted(analysis_id, keys.resume, keys.job_description, now);
    match tracking.create(&record).await {
        Ok(()) => {}
        Err(StoreError::AlreadyExists(_)) => return Err(duplicate_id(analysis_id)),
        Err(e) => return Err(e.into()),
    }

    info!(analysis_id, "Analysis submitted");

    if let Err(e) = dispatcher.dispatch(analysis_id).await {
        error!(analysis_id, "Failed to dispatch processing: {e}");
        mark_dispatch_failed(tracking, analysis_id, &e.to_string()).await;
    }

    Ok(SubmitResponse {
        status: "submitted".to_string(),
        analysis_id: analysis_id.to_string(),
        estimated_completion: now + Duration::seconds(estimated_completion_secs),
    })
}

/// Nothing will ever pick up a job that was not handed off, so the record is
/// moved to FAILED. Best effort: a store error here is only logged.
async fn mark_dispatch_failed(tracking: &dyn TrackingStore, analysis_id: &str, cause: &str) {
    let transition = Transition::Fail {
        at: Utc::now(),
        message: format!("Failed to start processing: {cause}"),
    };
    match tracking.transition(analysis_id, transition).await {
        Ok(TransitionOutcome::Applied) => {}
        Ok(outcome) => warn!(analysis_id, ?outcome, "Could not mark undispatched analysis FAILED"),
        Err(e) => error!(analysis_id, "Could not mark undispatched analysis FAILED ({e})"),
    }
}

fn duplicate_id(analysis_id: &str) -> AppError {
    AppError::Validation(format!("analysis_id '{analysis_id}' has already been submitted"))
}
