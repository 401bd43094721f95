//! Networking hints: retry with backoff and Brotli content negotiation.

use crate::config::RuleView;
use crate::detect::{FileDetector, Finding, Severity};

/// Call sites that issue a request.
const REQUEST_MARKERS: &[&str] = &[
    "dataTask",
    "URLSession.shared.data(",
    "URLSession.shared.dataTask(",
];

/// Words that suggest the request is already retried.
const RETRY_MARKERS: &[&str] = &["retry", "Retry", "Backoff", "backoff", "Task.sleep"];

#[derive(Debug, Clone)]
pub struct NetworkingDetector {
    require_brotli: bool,
    require_retry_with_backoff: bool,
}

impl NetworkingDetector {
    pub const NAME: &'static str = "Networking";
    pub const CONFIG_KEY: &'static str = "networking";

    pub fn new(require_brotli: bool, require_retry_with_backoff: bool) -> Self {
        Self {
            require_brotli,
            require_retry_with_backoff,
        }
    }

    pub fn from_settings(settings: &RuleView<'_>) -> Self {
        Self::new(
            settings.extra("requireBrotliAcceptEncoding", true),
            settings.extra("requireRetryWithBackoff", true),
        )
    }
}

impl Default for NetworkingDetector {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl FileDetector for NetworkingDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, path: &str, source: &str) -> anyhow::Result<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut has_brotli_header = false;
        let mut does_networking = false;

        for (idx, line) in source.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.contains("Accept-Encoding") && trimmed.contains("br") {
                has_brotli_header = true;
            }
            if trimmed.contains("URLSession") || trimmed.contains("URLRequest") {
                does_networking = true;
            }

            let is_request = REQUEST_MARKERS.iter().any(|m| trimmed.contains(m));
            if is_request {
                does_networking = true;
            }

            if self.require_retry_with_backoff
                && is_request
                && !RETRY_MARKERS.iter().any(|m| trimmed.contains(m))
            {
                findings.push(Finding::new(
                    Self::NAME,
                    Severity::Info,
                    path,
                    idx + 1,
                    "Consider retry with exponential backoff for transient errors (429/5xx/timeout).",
                ));
            }
        }

        if self.require_brotli && does_networking && !has_brotli_header {
            findings.push(Finding::new(
                Self::NAME,
                Severity::Info,
                path,
                1,
                "Add `Accept-Encoding: br` (Brotli) where server supports it to cut payload size.",
            ));
        }

        Ok(findings)
    }
}
