//! Artifact size budget gate.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Size limits. An unset limit is not enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeBudget {
    pub max_absolute_mb: Option<f64>,
    pub max_diff_mb: Option<f64>,
    pub max_increase_percent: Option<f64>,
}

/// Outcome of evaluating one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeReport {
    pub artifact_path: String,
    pub current_mb: f64,
    pub baseline_mb: Option<f64>,
    pub diff_mb: Option<f64>,
    pub diff_percent: Option<f64>,
    pub passes: bool,
    pub messages: Vec<String>,
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Evaluate a measured size against `budget`.
///
/// Gates run in order absolute, diff, percent, each adding one message. The
/// diff and percent gates need a positive baseline.
pub fn evaluate(
    artifact_path: &str,
    current_bytes: u64,
    baseline_mb: Option<f64>,
    budget: &SizeBudget,
) -> SizeReport {
    let current = bytes_to_mb(current_bytes);
    let baseline = baseline_mb.filter(|b| *b > 0.0);
    let mut messages = Vec::new();
    let mut passes = true;

    match budget.max_absolute_mb {
        Some(limit) if current > limit => {
            passes = false;
            messages.push(format!(
                "Artifact exceeds absolute budget: {:.2} MB > {:.2} MB",
                current, limit
            ));
        }
        Some(limit) => messages.push(format!(
            "Artifact within absolute budget: {:.2} MB ≤ {:.2} MB",
            current, limit
        )),
        None => messages.push(format!(
            "Absolute budget not set. Current size: {:.2} MB",
            current
        )),
    }

    let mut diff_mb = None;
    let mut diff_percent = None;

    if let Some(base) = baseline {
        let diff = current - base;
        let pct = diff / base * 100.0;
        diff_mb = Some(diff);
        diff_percent = Some(pct);

        match budget.max_diff_mb {
            Some(limit) if diff > limit => {
                passes = false;
                messages.push(format!(
                    "Size diff exceeds budget: {:+.2} MB > +{:.2} MB (baseline {:.2} MB → current {:.2} MB)",
                    diff, limit, base, current
                ));
            }
            Some(limit) => messages.push(format!(
                "Size diff within budget: {:+.2} MB ≤ +{:.2} MB (baseline {:.2} MB → current {:.2} MB)",
                diff, limit, base, current
            )),
            None => messages.push(format!("Diff budget not set. Diff: {:+.2} MB", diff)),
        }

        match budget.max_increase_percent {
            Some(limit) if pct > limit => {
                passes = false;
                messages.push(format!(
                    "Size increase exceeds percent budget: {:+.1}% > +{:.1}%",
                    pct, limit
                ));
            }
            Some(limit) => messages.push(format!(
                "Size increase within percent budget: {:+.1}% ≤ +{:.1}%",
                pct, limit
            )),
            None => messages.push(format!("Percent budget not set. Increase: {:+.1}%", pct)),
        }
    } else {
        messages.push("No baseline provided; diff and percent gates skipped".to_string());
    }

    debug!(artifact = artifact_path, current_mb = current, passes, "size gate evaluated");

    SizeReport {
        artifact_path: artifact_path.to_string(),
        current_mb: current,
        baseline_mb: baseline,
        diff_mb,
        diff_percent,
        passes,
        messages,
    }
}

/// Evaluate the artifact at `path`. Returns `None` when its size cannot be
/// read.
pub fn evaluate_path<P: AsRef<Path>>(
    path: P,
    baseline_mb: Option<f64>,
    budget: &SizeBudget,
) -> Option<SizeReport> {
    let path = path.as_ref();
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Some(evaluate(
            &path.to_string_lossy(),
            meta.len(),
            baseline_mb,
            budget,
        )),
        Ok(_) => {
            warn!(artifact = %path.display(), "artifact is not a file, size gate skipped");
            None
        }
        Err(e) => {
            warn!(artifact = %path.display(), error = %e, "cannot read artifact, size gate skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_absolute_budget_exceeded() {
        let budget = SizeBudget {
            max_absolute_mb: Some(200.0),
            ..Default::default()
        };
        let report = evaluate("App.ipa", 210 * MB, None, &budget);
        assert!(!report.passes);
        assert_eq!(
            report.messages[0],
            "Artifact exceeds absolute budget: 210.00 MB > 200.00 MB"
        );
    }

    #[test]
    fn test_no_baseline_skips_relative_gates() {
        let budget = SizeBudget {
            max_absolute_mb: Some(200.0),
            max_diff_mb: Some(1.0),
            max_increase_percent: Some(1.0),
        };
        let report = evaluate("App.ipa", 190 * MB, None, &budget);
        assert!(report.passes);
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[0].contains("within absolute budget"));
        assert!(report.messages[1].contains("skipped"));
        assert_eq!(report.diff_mb, None);
        assert_eq!(report.diff_percent, None);
    }

    #[test]
    fn test_diff_and_percent_gates() {
        let budget = SizeBudget {
            max_absolute_mb: None,
            max_diff_mb: Some(5.0),
            max_increase_percent: Some(2.0),
        };
        let report = evaluate("App.ipa", 104 * MB, Some(100.0), &budget);
        assert!(!report.passes);
        assert_eq!(report.diff_mb, Some(4.0));
        assert!((report.diff_percent.unwrap() - 4.0).abs() < 1e-9);
        assert!(report.messages[0].starts_with("Absolute budget not set"));
        assert!(report.messages[1].starts_with("Size diff within budget: +4.00 MB"));
        assert_eq!(
            report.messages[2],
            "Size increase exceeds percent budget: +4.0% > +2.0%"
        );
    }

    #[test]
    fn test_unset_gates_are_noted() {
        let report = evaluate("App.ipa", 50 * MB, Some(60.0), &SizeBudget::default());
        assert!(report.passes);
        assert_eq!(report.messages.len(), 3);
        assert!(report.messages[1].starts_with("Diff budget not set. Diff: -10.00 MB"));
        assert!(report.messages[2].starts_with("Percent budget not set"));
    }

    #[test]
    fn test_non_positive_baseline_is_absent() {
        let report = evaluate("App.ipa", MB, Some(0.0), &SizeBudget::default());
        assert_eq!(report.baseline_mb, None);
        assert!(report.messages[1].contains("skipped"));
    }

    #[test]
    fn test_evaluate_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let artifact = temp.path().join("App.ipa");
        std::fs::write(&artifact, vec![0u8; 2048]).unwrap();

        let report = evaluate_path(&artifact, None, &SizeBudget::default()).unwrap();
        assert!((report.current_mb - 2048.0 / BYTES_PER_MB).abs() < 1e-12);
        assert!(evaluate_path(temp.path().join("missing.ipa"), None, &SizeBudget::default()).is_none());
    }
}
