//! Offline summary built from finding counts.

use std::collections::BTreeMap;

use super::{AiSummary, SuggestionProvider};
use crate::detect::Finding;
use crate::diff::DiffFile;

/// Recommendation shown when a rule has findings.
fn recommendation(rule: &str) -> Option<&'static str> {
    match rule {
        "Accessibility" => Some("Add accessibility labels to images/buttons"),
        "Performance" => Some("Move JSON/image decoding off main thread"),
        "Networking" => Some("Add retry/backoff for transient network failures"),
        "Concurrency" => Some("Consider Sendable/actor isolation in concurrency-critical types"),
        "Security" => Some("Serve traffic over HTTPS and document any ATS exceptions"),
        "TestCoverage" => Some("Add unit and UI tests for the changed modules"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalHeuristicsProvider;

impl LocalHeuristicsProvider {
    pub const TITLE: &'static str = "Code Review Summary (Local)";

    pub fn new() -> Self {
        Self
    }

    /// Findings per rule, most frequent first, ties by rule name.
    pub fn rule_counts(findings: &[Finding]) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for f in findings {
            *counts.entry(f.rule()).or_default() += 1;
        }
        let mut sorted: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(rule, n)| (rule.to_string(), n))
            .collect();
        // BTreeMap order is by name, so a stable sort keeps name order on ties.
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }
}

impl SuggestionProvider for LocalHeuristicsProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn summarize(
        &self,
        findings: &[Finding],
        diff: Option<&[DiffFile]>,
    ) -> anyhow::Result<Option<AiSummary>> {
        if findings.is_empty() {
            return Ok(None);
        }

        let counts = Self::rule_counts(findings);
        let mut body = String::from("Top areas:\n");
        for (rule, n) in &counts {
            body.push_str(&format!("• {}: {} issues\n", rule, n));
        }

        if let Some(files) = diff {
            let added: usize = files.iter().map(|f| f.added_lines.len()).sum();
            body.push_str(&format!(
                "\nChange: {} file(s), {} added line(s)\n",
                files.len(),
                added
            ));
        }

        let recs: Vec<&str> = counts
            .iter()
            .filter_map(|(rule, _)| recommendation(rule))
            .collect();
        if !recs.is_empty() {
            body.push_str("\nRecommendations:\n");
            for r in recs {
                body.push_str(&format!("- {}\n", r));
            }
        }

        Ok(Some(AiSummary {
            title: Self::TITLE.to_string(),
            body: body.trim_end().to_string(),
        }))
    }
}
