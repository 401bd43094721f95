//! Optional summary of the findings, produced by a pluggable provider.
//!
//! Summaries are best-effort: provider errors are logged and the summary
//! is dropped, never failing the run.

mod local;
mod openai;

pub use local::LocalHeuristicsProvider;
pub use openai::OpenAiProvider;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::detect::Finding;
use crate::diff::DiffFile;

/// A titled block of prose shown above the findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSummary {
    pub title: String,
    pub body: String,
}

/// Failure talking to a remote provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider response had no content")]
    EmptyResponse,
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Produces a summary from the findings and, when available, the diff.
pub trait SuggestionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the provider had nothing to say or is not configured.
    fn summarize(
        &self,
        findings: &[Finding],
        diff: Option<&[DiffFile]>,
    ) -> anyhow::Result<Option<AiSummary>>;
}

/// The provider selected by `config.provider`; `None` when disabled.
pub fn provider_for(config: &AiConfig) -> Option<Box<dyn SuggestionProvider>> {
    match config.provider.trim().to_lowercase().as_str() {
        "none" | "off" | "disabled" | "" => None,
        "openai" => Some(Box::new(OpenAiProvider::from_env(config))),
        "local" => Some(Box::new(LocalHeuristicsProvider::new())),
        other => {
            warn!(provider = other, "unknown AI provider, using local heuristics");
            Some(Box::new(LocalHeuristicsProvider::new()))
        }
    }
}

/// Run `provider`, logging and discarding any error.
pub fn summarize_best_effort(
    provider: &dyn SuggestionProvider,
    findings: &[Finding],
    diff: Option<&[DiffFile]>,
) -> Option<AiSummary> {
    match provider.summarize(findings, diff) {
        Ok(summary) => {
            debug!(provider = provider.name(), produced = summary.is_some(), "summary done");
            summary
        }
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "summary provider failed, omitting summary");
            None
        }
    }
}
