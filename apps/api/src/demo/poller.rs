//! Polling Client: waits for an analysis to reach a terminal state.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::analysis::formatter::FormattedResult;
use crate::analysis::retrieval::RetrievalResponse;
use crate::demo::{ApiClient, DemoError};

/// Anything that can answer "what is the state of this analysis right now".
#[async_trait]
pub trait ResultsSource: Send + Sync {
    async fn fetch(&self, analysis_id: &str) -> Result<RetrievalResponse, DemoError>;
}

#[async_trait]
impl ResultsSource for ApiClient {
    async fn fetch(&self, analysis_id: &str) -> Result<RetrievalResponse, DemoError> {
        self.get_results(analysis_id).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(FormattedResult),
    Failed(String),
    /// A request failed, including "not found". Polling stops immediately.
    Error(String),
    TimedOut { attempts: u32 },
}

/// Queries `source` up to `config.max_attempts` times, sleeping `config.interval`
/// between attempts but not after the last one.
pub async fn poll_for_results<S>(source: &S, analysis_id: &str, config: PollConfig) -> PollOutcome
where
    S: ResultsSource + ?Sized,
{
    for attempt in 1..=config.max_attempts {
        info!("Analyzing... attempt {attempt}/{}", config.max_attempts);

        match source.fetch(analysis_id).await {
            Ok(RetrievalResponse::Completed { results }) => return PollOutcome::Completed(results),
            Ok(RetrievalResponse::Failed { error, .. }) => return PollOutcome::Failed(error),
            Ok(other) => debug!(analysis_id, "Still waiting: {other:?}"),
            Err(e) => return PollOutcome::Error(e.to_string()),
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    PollOutcome::TimedOut {
        attempts: config.max_attempts,
    }
}
