//! Inference engines: produce an `AnalysisOutput` from a resume and a job description.
//!
//! `AppState` and the processor hold an `Arc<dyn InferenceEngine>`, picked once at
//! startup: the LLM-backed engine when an API key is configured, the local
//! keyword-overlap heuristic otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::analysis::AnalysisOutput;

pub mod fallback;
pub mod llm;
pub mod prompts;

pub use fallback::KeywordOverlapAnalyzer;
pub use llm::LlmAnalyzer;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("inference engine unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisOutput, InferenceError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Chooses the engine for this process.
pub fn select_engine(config: &Config) -> Arc<dyn InferenceEngine> {
    let Some(api_key) = config.inference_api_key() else {
        info!("No inference credentials configured; using local keyword-overlap analysis");
        return Arc::new(KeywordOverlapAnalyzer);
    };

    match LlmClient::new(api_key.to_string(), config.inference_model.clone()) {
        Ok(client) => {
            info!("LLM inference engine initialized (model: {})", client.model());
            Arc::new(LlmAnalyzer::new(client))
        }
        Err(e) => {
            warn!("Failed to build LLM client ({e}); using local keyword-overlap analysis");
            Arc::new(KeywordOverlapAnalyzer)
        }
    }
}
