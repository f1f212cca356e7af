//! Result Formatter: derives the client-facing result from a stored `analysis_result`.
//!
//! Engines that return structured insights are read directly. Free-text results
//! (the local fallback, prose replies, older records) go through trigger-phrase
//! extraction. Everything here is a pure function of the stored JSON plus the
//! fallback timestamp, so repeated reads of one record format identically.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_LIST_ITEMS: usize = 5;
pub const MIN_RECOMMENDATION_CHARS: usize = 10;
pub const MIN_CONFIDENCE: i32 = 10;
pub const MAX_CONFIDENCE: i32 = 95;

const MOCK_DEFAULT_SKILLS: &[&str] = &["Python", "AWS", "Docker"];

const DEFAULT_RECOMMENDATIONS: &[&str] = &[
    "Add quantified achievements (e.g. 'cut build times by 40%')",
    "Mirror the key terms used in the job description",
    "Call out the specific technical skills the role asks for",
    "Open each bullet with a strong action verb",
    "Tailor the summary and experience sections to this role",
];

lazy_static! {
    static ref SKILL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\bmissing[:\s]+([^.]+)").unwrap(),
        Regex::new(r"(?i)\blacks?[:\s]+([^.]+)").unwrap(),
        Regex::new(r"(?i)\bshould add[:\s]+([^.]+)").unwrap(),
        Regex::new(r"(?i)\bneeds?[:\s]+([^.]+)").unwrap(),
        Regex::new(r"(?i)\bconsider adding[:\s]+([^.]+)").unwrap(),
    ];
    static ref RECOMMENDATION_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\brecommend[a-z]*[:\s]+([^.]+)").unwrap(),
        Regex::new(r"(?i)\bsuggest[a-z]*[:\s]+([^.]+)").unwrap(),
        Regex::new(r"(?i)\bshould[:\s]+([^.]+)").unwrap(),
        Regex::new(r"(?i)\bconsider[:\s]+([^.]+)").unwrap(),
        Regex::new(r"(?i)\bimprove[a-z]*[:\s]+([^.]+)").unwrap(),
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedResult {
    pub match_score: u32,
    pub missing_skills: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence_score: u32,
    pub analysis_timestamp: String,
}

/// Formats a stored `analysis_result`. Missing or mistyped fields fall back to
/// score 0, empty text, `is_mock = false`, and `fallback_timestamp`.
pub fn format_analysis_result(result: &Value, fallback_timestamp: &str) -> FormattedResult {
    let match_score = read_match_score(result);
    let analysis = result
        .get("analysis")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let is_mock = result
        .get("is_mock")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let analysis_timestamp = result
        .get("timestamp")
        .and_then(Value::as_str)
        .unwrap_or(fallback_timestamp)
        .to_string();

    let missing_skills = match read_string_list(result, "missing_skills") {
        Some(listed) => dedup_capped(listed),
        None => extract_missing_skills(analysis, is_mock),
    };

    let recommendations = match read_string_list(result, "recommendations") {
        Some(mut listed) => {
            listed.truncate(MAX_LIST_ITEMS);
            with_default_recommendations(listed)
        }
        None => extract_recommendations(analysis),
    };

    FormattedResult {
        match_score,
        missing_skills,
        recommendations,
        confidence_score: confidence_score(match_score, is_mock, analysis.chars().count()),
        analysis_timestamp,
    }
}

/// Skills named after `missing`, `lack(s)`, `should add`, `need(s)` or
/// `consider adding`, split on commas. Deduplicated, first occurrence wins, at
/// most five. A mock analysis with no hits gets a fixed default list.
pub fn extract_missing_skills(analysis: &str, is_mock: bool) -> Vec<String> {
    let mut found = Vec::new();
    for pattern in SKILL_PATTERNS.iter() {
        for caps in pattern.captures_iter(analysis) {
            found.extend(caps[1].split(',').filter_map(clean_item));
        }
    }

    let skills = dedup_capped(found);
    if skills.is_empty() && (is_mock || analysis.to_lowercase().contains("mock")) {
        return MOCK_DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect();
    }
    skills
}

/// Clauses after `recommend*`, `suggest*`, `should`, `consider` or `improve*`
/// that are longer than ten characters, at most five. Falls back to five
/// generic recommendations.
pub fn extract_recommendations(analysis: &str) -> Vec<String> {
    let mut found = Vec::new();
    for pattern in RECOMMENDATION_PATTERNS.iter() {
        for caps in pattern.captures_iter(analysis) {
            if let Some(item) = clean_item(&caps[1]) {
                if item.chars().count() > MIN_RECOMMENDATION_CHARS {
                    found.push(item);
                }
            }
        }
    }
    found.truncate(MAX_LIST_ITEMS);
    with_default_recommendations(found)
}

/// Base 70, adjusted by score band, mock flag and text length; clamped to [10, 95].
pub fn confidence_score(match_score: u32, is_mock: bool, analysis_len: usize) -> u32 {
    let mut confidence: i32 = 70;

    confidence += match match_score {
        80.. => 20,
        60..=79 => 10,
        40..=59 => 5,
        _ => -10,
    };

    if is_mock {
        confidence -= 30;
    }

    if analysis_len > 500 {
        confidence += 10;
    } else if analysis_len < 100 {
        confidence -= 15;
    }

    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE) as u32
}

fn read_match_score(result: &Value) -> u32 {
    let raw = match result.get("match_score") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    raw.clamp(0.0, 100.0) as u32
}

fn read_string_list(result: &Value, field: &str) -> Option<Vec<String>> {
    result.get(field).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(clean_item)
            .collect()
    })
}

/// Trims whitespace and surrounding quotes; `None` if nothing is left.
fn clean_item(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn dedup_capped(items: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(MAX_LIST_ITEMS);
    for item in items {
        if unique.len() == MAX_LIST_ITEMS {
            break;
        }
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

fn with_default_recommendations(found: Vec<String>) -> Vec<String> {
    if found.is_empty() {
        DEFAULT_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
    } else {
        found
    }
}
