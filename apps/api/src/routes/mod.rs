pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/analyze", post(handlers::handle_submit))
        .route("/results", get(handlers::handle_missing_id))
        .route("/results/", get(handlers::handle_missing_id))
        .route("/results/:analysis_id", get(handlers::handle_get_results))
        .with_state(state)
}

/// The router as served: request tracing plus permissive CORS on every
/// response, error responses included.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::test_config;
    use crate::dispatch::{DispatchError, ProcessingDispatcher};
    use crate::storage::memory::{MemoryBlobStore, MemoryTrackingStore};
    use crate::storage::TrackingStore;

    /// Accepts every job and runs nothing, so records stay SUBMITTED.
    struct NoopDispatcher;

    #[async_trait]
    impl ProcessingDispatcher for NoopDispatcher {
        async fn dispatch(&self, _analysis_id: &str) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    struct TestApp {
        tracking: Arc<MemoryTrackingStore>,
        blobs: Arc<MemoryBlobStore>,
        router: Router,
    }

    fn test_app() -> TestApp {
        let tracking = Arc::new(MemoryTrackingStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let state = AppState {
            tracking: tracking.clone(),
            blobs: blobs.clone(),
            dispatcher: Arc::new(NoopDispatcher),
            config: test_config(),
        };
        TestApp {
            tracking,
            blobs,
            router: build_app(state),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_analyze(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_immediate_poll_reports_processing() {
        let app = test_app();

        let (status, body) = send(
            &app.router,
            post_analyze(json!({
                "analysis_id": "test-123",
                "resume_text": "Python developer with five years of AWS",
                "job_description": "Looking for a Python developer"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "submitted");
        assert_eq!(body["analysis_id"], "test-123");
        assert!(body["estimated_completion"].is_string());

        let (status, body) = send(&app.router, get("/results/test-123")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "processing");
        assert_eq!(body["message"], "Analysis is queued for processing");
    }

    #[tokio::test]
    async fn test_unknown_id_returns_404() {
        let app = test_app();
        let (status, body) = send(&app.router, get("/results/never-submitted")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_missing_id_returns_400() {
        let app = test_app();
        for uri in ["/results", "/results/"] {
            let (status, body) = send(&app.router, get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_empty_resume_returns_400_without_writes() {
        let app = test_app();
        let (status, body) = send(
            &app.router,
            post_analyze(json!({
                "analysis_id": "test-123",
                "resume_text": "",
                "job_description": "Looking for a Python developer"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(app.blobs.object_count().await, 0);
        assert!(app.tracking.get("test-123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_field_and_malformed_body_return_400() {
        let app = test_app();

        let (status, _) = send(
            &app.router,
            post_analyze(json!({"analysis_id": "x", "resume_text": "r"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let malformed = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app.router, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_health_is_ok_when_everything_is_reachable() {
        let app = test_app();
        let (status, body) = send(&app.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["tracking_store"]["status"], "healthy");
        assert_eq!(body["checks"]["blob_store"]["status"], "healthy");
        assert_eq!(body["checks"]["environment"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_health_reports_unreachable_tracking_store() {
        let app = test_app();
        app.tracking.set_unavailable(true);

        let (status, body) = send(&app.router, get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["checks"]["tracking_store"]["status"], "unhealthy");
        assert_eq!(body["checks"]["blob_store"]["status"], "healthy");
        assert_eq!(body["checks"]["environment"]["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_health_reports_missing_configuration() {
        let tracking = Arc::new(MemoryTrackingStore::new());
        let mut config = test_config();
        config.raw_inputs_bucket = None;
        let router = build_router(AppState {
            tracking,
            blobs: Arc::new(MemoryBlobStore::new()),
            dispatcher: Arc::new(NoopDispatcher),
            config,
        });

        let (status, body) = send(&router, get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let message = body["checks"]["environment"]["message"].as_str().unwrap();
        assert!(message.contains("RAW_INPUTS_BUCKET"));
    }

    #[tokio::test]
    async fn test_cors_header_on_success_and_error_responses() {
        let app = test_app();
        let with_origin = |mut request: Request<Body>| {
            request
                .headers_mut()
                .insert("origin", "http://localhost:3000".parse().unwrap());
            request
        };

        let accepted = with_origin(post_analyze(json!({
            "analysis_id": "cors-1",
            "resume_text": "Rust developer",
            "job_description": "Rust role"
        })));
        let not_found = with_origin(get("/results/never-submitted"));

        for (request, expected) in [
            (accepted, StatusCode::ACCEPTED),
            (not_found, StatusCode::NOT_FOUND),
        ] {
            let response = app.router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), expected);
            assert_eq!(response.headers()["access-control-allow-origin"], "*");
        }

        app.tracking.set_unavailable(true);
        let response = app
            .router
            .clone()
            .oneshot(with_origin(get("/health")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
