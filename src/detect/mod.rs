//! Detector framework: findings, detector traits, registry and runner.

mod registry;
mod runner;
mod traits;
mod types;

pub mod rules;

pub use registry::{build, build_file_detectors, build_project_detectors, known_keys, DetectorSet};
pub use runner::{run_file_detectors, run_project_detectors, Runner};
pub use traits::{FileDetector, ProjectDetector};
pub use types::{has_errors, severity_counts, Finding, Severity};
