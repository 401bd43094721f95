//! Combines findings and gate verdicts into one decision.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ai::AiSummary;
use crate::detect::{has_errors, severity_counts, Finding};

use super::{PerfComparison, SizeReport};

/// Everything one run produced, handed to the renderers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateReport {
    pub findings: Vec<Finding>,
    pub ai_summary: Option<AiSummary>,
    pub perf: Option<PerfComparison>,
    pub size: Option<SizeReport>,
}

impl GateReport {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            ..Default::default()
        }
    }

    pub fn decide(&self) -> Decision {
        decide(self)
    }
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    ErrorFindings { count: usize },
    PerfRegression { regressions: usize },
    SizeBudget,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ErrorFindings { count } => {
                write!(f, "{} error-severity finding(s)", count)
            }
            FailureReason::PerfRegression { regressions } => {
                write!(f, "{} performance regression(s)", regressions)
            }
            FailureReason::SizeBudget => write!(f, "size budget exceeded"),
        }
    }
}

/// The overall verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub passed: bool,
    pub failures: Vec<FailureReason>,
}

/// Fail when any finding is an error, or a computed gate did not pass.
/// Gates that were not computed never fail the run.
pub fn decide(report: &GateReport) -> Decision {
    let mut failures = Vec::new();

    if has_errors(&report.findings) {
        let (_, _, errors) = severity_counts(&report.findings);
        failures.push(FailureReason::ErrorFindings { count: errors });
    }

    if let Some(perf) = report.perf.as_ref().filter(|p| !p.passes) {
        failures.push(FailureReason::PerfRegression {
            regressions: perf.regressions.len(),
        });
    }

    if report.size.as_ref().is_some_and(|s| !s.passes) {
        failures.push(FailureReason::SizeBudget);
    }

    Decision {
        passed: failures.is_empty(),
        failures,
    }
}
