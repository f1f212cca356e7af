use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
}

impl CheckResult {
    fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            message: message.into(),
        }
    }

    fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: message.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub tracking_store: CheckResult,
    pub blob_store: CheckResult,
    pub environment: CheckResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// GET /health
/// Checks both stores and the required configuration. 503 if anything is unhealthy.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let tracking_store = match state.tracking.ping().await {
        Ok(()) => CheckResult::healthy("Tracking store accessible"),
        Err(e) => CheckResult::unhealthy(format!("Tracking store error: {e}")),
    };

    let blob_store = match state.blobs.ping().await {
        Ok(()) => CheckResult::healthy("Blob store accessible"),
        Err(e) => CheckResult::unhealthy(format!("Blob store error: {e}")),
    };

    let missing = state.config.missing_required();
    let environment = if missing.is_empty() {
        CheckResult::healthy("All required environment variables present")
    } else {
        CheckResult::unhealthy(format!(
            "Missing environment variables: {}",
            missing.join(", ")
        ))
    };

    let checks = HealthChecks {
        tracking_store,
        blob_store,
        environment,
    };
    let all_healthy = [&checks.tracking_store, &checks.blob_store, &checks.environment]
        .iter()
        .all(|check| check.is_healthy());

    let (code, status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        tracing::warn!("Health check failed: {checks:?}");
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(HealthReport {
            status: status.to_string(),
            timestamp: Utc::now(),
            checks,
        }),
    )
}
