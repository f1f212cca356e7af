//! Fire-and-forget hand-off from submission to processing.
//!
//! `dispatch` returns as soon as the job is handed over. The submitter never
//! learns how processing went; it polls the tracking record instead.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::processor::Processor;

pub mod redis_queue;

pub use redis_queue::{run_queue_worker, RedisQueueDispatcher};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("queue error: {0}")]
    Queue(#[from] redis::RedisError),

    #[error("payload encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Message handed to the processing side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub analysis_id: String,
}

#[async_trait]
pub trait ProcessingDispatcher: Send + Sync {
    async fn dispatch(&self, analysis_id: &str) -> Result<(), DispatchError>;
}

/// Runs each job on its own tokio task in this process. At-most-once: a job in
/// flight is lost if the process exits.
pub struct SpawnDispatcher {
    processor: Arc<Processor>,
}

impl SpawnDispatcher {
    pub fn new(processor: Arc<Processor>) -> Self {
        info!("Processing jobs run in-process");
        Self { processor }
    }
}

#[async_trait]
impl ProcessingDispatcher for SpawnDispatcher {
    async fn dispatch(&self, analysis_id: &str) -> Result<(), DispatchError> {
        let processor = Arc::clone(&self.processor);
        let analysis_id = analysis_id.to_string();
        debug!(%analysis_id, "Spawning processing task");
        tokio::spawn(async move {
            processor.process(&analysis_id).await;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;

    use crate::inference::KeywordOverlapAnalyzer;
    use crate::models::analysis::AnalysisRecord;
    use crate::storage::memory::{MemoryBlobStore, MemoryTrackingStore};
    use crate::storage::{BlobStore, InputKeys, TrackingStore};

    #[test]
    fn test_process_request_wire_format() {
        let payload = serde_json::to_string(&ProcessRequest {
            analysis_id: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(payload, r#"{"analysis_id":"abc"}"#);
    }

    #[tokio::test]
    async fn test_spawned_job_completes_in_background() {
        let tracking = Arc::new(MemoryTrackingStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let keys = InputKeys::for_analysis("bg");
        blobs.put_text(&keys.resume, "rust tokio").await.unwrap();
        blobs.put_text(&keys.job_description, "rust axum").await.unwrap();
        tracking
            .create(&AnalysisRecord::submitted(
                "bg",
                keys.resume,
                keys.job_description,
                Utc::now(),
            ))
            .await
            .unwrap();

        let processor = Arc::new(Processor::new(
            tracking.clone(),
            blobs,
            Arc::new(KeywordOverlapAnalyzer),
        ));
        SpawnDispatcher::new(processor).dispatch("bg").await.unwrap();

        let mut status = String::new();
        for _ in 0..50 {
            status = tracking.get("bg").await.unwrap().unwrap().status;
            if status == "COMPLETED" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, "COMPLETED");
    }
}
