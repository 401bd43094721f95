//! Core types for detection results.

use serde::{Deserialize, Serialize};

/// Severity levels for findings, ordered `Info < Warning < Error`.
///
/// Only `Error` can fail a run on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Whether a finding of this severity fails the gate.
    pub fn is_blocking(&self) -> bool {
        *self == Severity::Error
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// A single reported issue.
///
/// Findings are plain values: fields are private and only readable, so a
/// finding cannot change after a detector produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    rule: String,
    severity: Severity,
    file: String,
    line: usize,
    message: String,
}

impl Finding {
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            severity,
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Identifier of the detector that produced this finding.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {}:{} {}",
            self.severity, self.rule, self.file, self.line, self.message
        )
    }
}

/// Check if any finding in the slice blocks the gate.
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity().is_blocking())
}

/// Count findings per severity, in `(info, warning, error)` order.
pub fn severity_counts(findings: &[Finding]) -> (usize, usize, usize) {
    findings
        .iter()
        .fold((0, 0, 0), |(i, w, e), f| match f.severity() {
            Severity::Info => (i + 1, w, e),
            Severity::Warning => (i, w + 1, e),
            Severity::Error => (i, w, e + 1),
        })
}
