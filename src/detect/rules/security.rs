//! Transport security: plain HTTP and disabled App Transport Security.

use crate::detect::{FileDetector, Finding, Severity};

#[derive(Debug, Clone, Default)]
pub struct SecurityDetector;

impl SecurityDetector {
    pub const NAME: &'static str = "Security";
    pub const CONFIG_KEY: &'static str = "security";

    pub fn new() -> Self {
        Self
    }
}

impl FileDetector for SecurityDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, path: &str, source: &str) -> anyhow::Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.contains("http://") {
                findings.push(Finding::new(
                    Self::NAME,
                    Severity::Warning,
                    path,
                    idx + 1,
                    "Plain HTTP detected. Use HTTPS or whitelist with ATS justification.",
                ));
            }
            if trimmed.contains("NSAllowsArbitraryLoads") {
                findings.push(Finding::new(
                    Self::NAME,
                    Severity::Info,
                    path,
                    idx + 1,
                    "ATS disabled (NSAllowsArbitraryLoads). Ensure this is intentional & documented.",
                ));
            }
        }

        Ok(findings)
    }
}
