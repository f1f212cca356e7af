use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;

use crate::inference::{InferenceEngine, InferenceError};
use crate::models::analysis::AnalysisOutput;

const POINTS_PER_SHARED_WORD: usize = 5;
const SAMPLE_WORDS: usize = 10;

/// Local stand-in used when no inference engine is configured.
///
/// Score = min(100, 5 × |shared lowercase words|). The output is flagged
/// `is_mock` so the formatter lowers its confidence.
pub struct KeywordOverlapAnalyzer;

#[async_trait]
impl InferenceEngine for KeywordOverlapAnalyzer {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AnalysisOutput, InferenceError> {
        Ok(keyword_overlap_analysis(resume_text, job_description))
    }

    fn name(&self) -> &'static str {
        "keyword-overlap"
    }
}

pub fn keyword_overlap_analysis(resume_text: &str, job_description: &str) -> AnalysisOutput {
    let shared = shared_words(resume_text, job_description);
    let match_score = (shared.len() * POINTS_PER_SHARED_WORD).min(100) as u32;

    AnalysisOutput {
        match_score,
        analysis: render_mock_analysis(match_score, &shared),
        timestamp: Utc::now(),
        is_mock: true,
        insights: None,
    }
}

/// Lowercased whitespace-separated words present in both texts, sorted.
fn shared_words(a: &str, b: &str) -> Vec<String> {
    let words_a = word_set(a);
    let words_b = word_set(b);
    words_a.intersection(&words_b).cloned().collect()
}

fn word_set(text: &str) -> BTreeSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

fn render_mock_analysis(match_score: u32, shared: &[String]) -> String {
    let sample = if shared.is_empty() {
        "(none)".to_string()
    } else {
        shared
            .iter()
            .take(SAMPLE_WORDS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "MOCK ANALYSIS (local keyword overlap, no inference engine configured)\n\
         \n\
         Match score: {match_score}/100\n\
         \n\
         The resume and the job description share {count} distinct words.\n\
         Shared words: {sample}\n\
         \n\
         This result was computed without an AI review. \
         Set ANTHROPIC_API_KEY to enable a detailed assessment.",
        count = shared.len(),
    )
}
