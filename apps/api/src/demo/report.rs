use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::analysis::formatter::FormattedResult;

const NEXT_STEPS: &[&str] = &[
    "Address the missing skills through training or certification",
    "Update your resume to highlight relevant experience",
    "Practice interview questions related to the identified gaps",
    "Consider networking with professionals in your target role",
];

/// Renders a plain-text report for one completed analysis.
pub fn generate_text_report(results: &FormattedResult, generated_at: DateTime<Utc>) -> String {
    let mut report = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(report, "Resume Match Analysis Report");
    let _ = writeln!(report, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(report);

    section(&mut report, "EXECUTIVE SUMMARY");
    let _ = writeln!(report, "Match Score: {}%", results.match_score);
    let _ = writeln!(report, "Confidence Score: {}%", results.confidence_score);
    let _ = writeln!(report, "Analysis Date: {}", results.analysis_timestamp);
    let _ = writeln!(report);

    section(&mut report, "MISSING SKILLS ANALYSIS");
    if results.missing_skills.is_empty() {
        let _ = writeln!(report, "No critical missing skills identified.");
    }
    for skill in &results.missing_skills {
        let _ = writeln!(report, "- {skill}");
    }
    let _ = writeln!(report);

    section(&mut report, "IMPROVEMENT RECOMMENDATIONS");
    if results.recommendations.is_empty() {
        let _ = writeln!(report, "No specific recommendations at this time.");
    }
    for (i, rec) in results.recommendations.iter().enumerate() {
        let _ = writeln!(report, "{}. {rec}", i + 1);
    }
    let _ = writeln!(report);

    section(&mut report, "NEXT STEPS");
    for (i, step) in NEXT_STEPS.iter().enumerate() {
        let _ = writeln!(report, "{}. {step}", i + 1);
    }

    report
}

fn section(report: &mut String, title: &str) {
    let _ = writeln!(report, "{title}");
    let _ = writeln!(report, "{}", "=".repeat(title.len()));
}
