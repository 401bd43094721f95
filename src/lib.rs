//! reviewgate - CI review gate for Swift projects.
//!
//! A review run scans a source tree with line-oriented detectors, scopes
//! the findings to a unified diff when asked, compares performance metrics
//! and artifact size against baselines, and turns all of it into a single
//! pass/fail decision plus a report.
//!
//! # Architecture
//!
//! - `detect`: findings, detector traits, the registry and the runner
//! - `diff`: unified-diff parsing and changed-line lookup
//! - `gate`: perf and size regression gates and the final decision
//! - `ai`: optional summary providers
//! - `pipeline`: one run from inputs to a [`GateReport`]
//! - `report`: Markdown, JSON and terminal output
//! - `config`: YAML/JSON configuration
//! - `scan`: which files under the source root are reviewed
//!
//! # Adding a Detector
//!
//! Implement [`FileDetector`] or [`ProjectDetector`] in `src/detect/rules/`
//! and add a factory entry in `detect/registry.rs`.

pub mod ai;
pub mod cli;
pub mod config;
pub mod detect;
pub mod diff;
pub mod gate;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod scan;

pub use ai::{AiSummary, SuggestionProvider};
pub use config::Config;
pub use detect::{FileDetector, Finding, ProjectDetector, Runner, Severity};
pub use diff::{DiffFile, DiffIndex};
pub use gate::{decide, Decision, GateReport};
pub use pipeline::{Pipeline, PipelineOptions};
