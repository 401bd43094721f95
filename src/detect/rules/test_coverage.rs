//! Project-level check that the tree carries a minimum number of test files.

use std::path::Path;

use crate::config::{RuleView, ScanConfig};
use crate::detect::{Finding, ProjectDetector, Severity};
use crate::paths;
use crate::scan::SourceFilter;

pub const DEFAULT_MIN_UNIT_TEST_FILES: usize = 5;
pub const DEFAULT_MIN_UI_TEST_FILES: usize = 1;

/// `file` of project findings: the source root itself.
pub const PROJECT_FILE: &str = ".";

/// Counts test files by path convention: any path containing `tests` is a
/// test file, and `uitests` marks it as a UI test. Only files the scan
/// selects are counted.
#[derive(Debug, Clone)]
pub struct TestCoverageDetector {
    min_unit_test_files: usize,
    min_ui_test_files: usize,
    scan: ScanConfig,
}

/// Test file counts found under a source root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestFileCounts {
    pub unit: usize,
    pub ui: usize,
}

impl TestCoverageDetector {
    pub const NAME: &'static str = "TestCoverage";
    pub const CONFIG_KEY: &'static str = "tests";

    pub fn new(min_unit_test_files: usize, min_ui_test_files: usize, scan: ScanConfig) -> Self {
        Self {
            min_unit_test_files,
            min_ui_test_files,
            scan,
        }
    }

    pub fn from_settings(settings: &RuleView<'_>, scan: &ScanConfig) -> Self {
        Self::new(
            settings.threshold("minUnitTestFiles", DEFAULT_MIN_UNIT_TEST_FILES),
            settings.threshold("minUITestFiles", DEFAULT_MIN_UI_TEST_FILES),
            scan.clone(),
        )
    }

    /// Walk `root` and count unit and UI test files.
    pub fn count(&self, root: &Path) -> anyhow::Result<TestFileCounts> {
        let mut counts = TestFileCounts::default();

        for path in SourceFilter::new(&self.scan)?.walk(root)? {
            let lower = paths::relativize(&path, root).to_lowercase();
            if lower.contains("tests") {
                if lower.contains("uitests") {
                    counts.ui += 1;
                } else {
                    counts.unit += 1;
                }
            }
        }

        Ok(counts)
    }
}

impl Default for TestCoverageDetector {
    fn default() -> Self {
        Self::new(
            DEFAULT_MIN_UNIT_TEST_FILES,
            DEFAULT_MIN_UI_TEST_FILES,
            ScanConfig::default(),
        )
    }
}

impl ProjectDetector for TestCoverageDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate_project(&self, source_root: &Path) -> anyhow::Result<Vec<Finding>> {
        let counts = self.count(source_root)?;
        let mut findings = Vec::new();

        if counts.unit < self.min_unit_test_files {
            findings.push(Finding::new(
                Self::NAME,
                Severity::Warning,
                PROJECT_FILE,
                1,
                format!(
                    "Unit test files: {} (< {}). Add coverage for core modules.",
                    counts.unit, self.min_unit_test_files
                ),
            ));
        }
        if counts.ui < self.min_ui_test_files {
            findings.push(Finding::new(
                Self::NAME,
                Severity::Info,
                PROJECT_FILE,
                1,
                format!(
                    "UI test files: {} (< {}). Add at least one UITest for smoke flows.",
                    counts.ui, self.min_ui_test_files
                ),
            ));
        }

        Ok(findings)
    }
}
