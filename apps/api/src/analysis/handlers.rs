use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::analysis::retrieval::{get_analysis, RetrievalResponse};
use crate::analysis::submit::{submit_analysis, SubmitRequest, SubmitResponse};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /analyze
pub async fn handle_submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let Json(req) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let response = submit_analysis(
        state.tracking.as_ref(),
        state.blobs.as_ref(),
        state.dispatcher.as_ref(),
        &req,
        state.config.estimated_completion_secs,
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /results/:analysis_id
pub async fn handle_get_results(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> Result<Json<RetrievalResponse>, AppError> {
    let response = get_analysis(state.tracking.as_ref(), &analysis_id).await?;
    Ok(Json(response))
}

/// GET /results
pub async fn handle_missing_id() -> AppError {
    AppError::Validation("analysis_id is required".to_string())
}
