//! Detector capability traits.

use std::path::Path;

use super::Finding;

/// A detector that evaluates one source file at a time.
///
/// Implementations capture their settings at construction and must be a
/// pure function of `(path, source)` afterwards, so the runner may call
/// them from several threads at once.
pub trait FileDetector: Send + Sync {
    /// Rule identifier reported on every finding.
    fn name(&self) -> &'static str;

    /// Evaluate a single file.
    ///
    /// `path` is the display path (relative to the source root) and is
    /// copied into each finding unchanged.
    fn evaluate(&self, path: &str, source: &str) -> anyhow::Result<Vec<Finding>>;
}

/// A detector that evaluates the whole source tree once.
///
/// Project detectors may walk the tree themselves but must not modify it.
pub trait ProjectDetector: Send + Sync {
    /// Rule identifier reported on every finding.
    fn name(&self) -> &'static str;

    fn evaluate_project(&self, source_root: &Path) -> anyhow::Result<Vec<Finding>>;
}
