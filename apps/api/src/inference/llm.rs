use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::inference::prompts::{build_analysis_prompt, ANALYSIS_SYSTEM};
use crate::inference::{InferenceEngine, InferenceError};
use crate::llm_client::{strip_json_fences, LlmClient};
use crate::models::analysis::{AnalysisOutput, StructuredInsights};

/// Score used when a prose reply carries no recognisable score.
const DEFAULT_PROSE_SCORE: u32 = 75;

lazy_static! {
    static ref SCORE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"match score[:\s]+(\d+)").unwrap(),
        Regex::new(r"score[:\s]+(\d+)").unwrap(),
        Regex::new(r"(\d+)/100").unwrap(),
        Regex::new(r"(\d+)%").unwrap(),
    ];
}

/// Inference engine backed by the Anthropic Messages API.
pub struct LlmAnalyzer {
    client: LlmClient,
}

impl LlmAnalyzer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InferenceEngine for LlmAnalyzer {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisOutput, InferenceError> {
        let prompt = build_analysis_prompt(resume_text, job_description);
        let reply = self.client.complete(&prompt, ANALYSIS_SYSTEM).await?;
        Ok(interpret_reply(&reply, Utc::now()))
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

#[derive(Debug, Deserialize)]
struct StructuredReply {
    match_score: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    missing_skills: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Turns the model's reply into an `AnalysisOutput`.
///
/// A JSON reply keeps its lists as structured insights. Anything else is kept
/// as free text and the score is pattern-matched out of it.
pub fn interpret_reply(reply: &str, now: DateTime<Utc>) -> AnalysisOutput {
    match serde_json::from_str::<StructuredReply>(strip_json_fences(reply)) {
        Ok(structured) => {
            debug!("LLM returned structured analysis");
            let analysis = if structured.summary.trim().is_empty() {
                reply.trim().to_string()
            } else {
                structured.summary
            };
            AnalysisOutput {
                match_score: structured.match_score.clamp(0.0, 100.0) as u32,
                analysis,
                timestamp: now,
                is_mock: false,
                insights: Some(StructuredInsights {
                    missing_skills: structured.missing_skills,
                    recommendations: structured.recommendations,
                }),
            }
        }
        Err(e) => {
            warn!("LLM reply was not structured JSON ({e}); keeping free text");
            AnalysisOutput {
                match_score: extract_match_score(reply),
                analysis: reply.to_string(),
                timestamp: now,
                is_mock: false,
                insights: None,
            }
        }
    }
}

/// First score found by the patterns, in priority order; capped at 100.
pub fn extract_match_score(text: &str) -> u32 {
    let lower = text.to_lowercase();
    SCORE_PATTERNS
        .iter()
        .find_map(|re| {
            re.captures(&lower)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
        })
        .map(|score| score.min(100) as u32)
        .unwrap_or(DEFAULT_PROSE_SCORE)
}
