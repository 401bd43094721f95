//! Detector runner that executes the active detectors over a file set.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;
use tracing::{debug, dispatcher, Dispatch};

use crate::paths;

use super::{DetectorSet, FileDetector, Finding, ProjectDetector};

/// Run every file detector once on one file, in detector order.
///
/// The first detector error aborts the call and is returned unchanged.
pub fn run_file_detectors(
    detectors: &[Box<dyn FileDetector>],
    path: &str,
    source: &str,
) -> anyhow::Result<Vec<Finding>> {
    let mut findings = Vec::new();
    for detector in detectors {
        let found = detector.evaluate(path, source)?;
        debug!(detector = detector.name(), file = path, count = found.len(), "file detector done");
        findings.extend(found);
    }
    Ok(findings)
}

/// Run every project detector once against the source root, in detector order.
pub fn run_project_detectors(
    detectors: &[Box<dyn ProjectDetector>],
    source_root: &Path,
) -> anyhow::Result<Vec<Finding>> {
    let mut findings = Vec::new();
    for detector in detectors {
        let found = detector.evaluate_project(source_root)?;
        debug!(detector = detector.name(), count = found.len(), "project detector done");
        findings.extend(found);
    }
    Ok(findings)
}

/// Executes a detector set against the files under a source root.
pub struct Runner {
    base_dir: PathBuf,
    parallel: bool,
    dispatch: Dispatch,
}

impl Runner {
    /// Create a runner for `base_dir`, logging to the current default dispatch.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            parallel: true,
            dispatch: dispatcher::get_default(|d| d.clone()),
        }
    }

    /// Set whether files are evaluated on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Log through `dispatch`, including from worker threads.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    fn evaluate_file(
        &self,
        detectors: &[Box<dyn FileDetector>],
        file: &Path,
    ) -> anyhow::Result<Vec<Finding>> {
        let source = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read file: {}", file.display()))?;
        let display = paths::relativize(file, &self.base_dir);
        run_file_detectors(detectors, &display, &source)
    }

    /// Run the file detectors over `files`.
    ///
    /// Output is in file order, then detector order, whether or not the
    /// files were evaluated in parallel. An unreadable file or a failing
    /// detector aborts the run; with several failures the one for the
    /// earliest file is returned.
    pub fn run_files(
        &self,
        detectors: &[Box<dyn FileDetector>],
        files: &[PathBuf],
    ) -> anyhow::Result<Vec<Finding>> {
        if detectors.is_empty() {
            return Ok(Vec::new());
        }

        let per_file: Vec<anyhow::Result<Vec<Finding>>> = if self.parallel {
            files
                .par_iter()
                .map(|file| {
                    dispatcher::with_default(&self.dispatch, || self.evaluate_file(detectors, file))
                })
                .collect()
        } else {
            files
                .iter()
                .map(|file| self.evaluate_file(detectors, file))
                .collect()
        };

        let mut findings = Vec::new();
        for result in per_file {
            findings.extend(result?);
        }
        Ok(findings)
    }

    /// Run the whole set: file detectors over `files`, then project detectors.
    pub fn run(&self, set: &DetectorSet, files: &[PathBuf]) -> anyhow::Result<Vec<Finding>> {
        dispatcher::with_default(&self.dispatch, || {
            debug!(
                files = files.len(),
                detectors = ?set.names(),
                parallel = self.parallel,
                "running detectors"
            );
            let mut findings = self.run_files(&set.file, files)?;
            findings.extend(run_project_detectors(&set.project, &self.base_dir)?);
            Ok(findings)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Severity;
    use tempfile::TempDir;

    struct LineCounter;

    impl FileDetector for LineCounter {
        fn name(&self) -> &'static str {
            "LineCounter"
        }

        fn evaluate(&self, path: &str, source: &str) -> anyhow::Result<Vec<Finding>> {
            Ok(vec![Finding::new(
                self.name(),
                Severity::Info,
                path,
                source.lines().count(),
                "lines",
            )])
        }
    }

    struct Marker(&'static str);

    impl FileDetector for Marker {
        fn name(&self) -> &'static str {
            self.0
        }

        fn evaluate(&self, path: &str, source: &str) -> anyhow::Result<Vec<Finding>> {
            Ok(source
                .lines()
                .enumerate()
                .filter(|(_, l)| l.contains(self.0))
                .map(|(i, _)| Finding::new(self.0, Severity::Warning, path, i + 1, "marker"))
                .collect())
        }
    }

    struct Failing;

    impl FileDetector for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn evaluate(&self, path: &str, _source: &str) -> anyhow::Result<Vec<Finding>> {
            anyhow::bail!("cannot evaluate {}", path)
        }
    }

    fn write_files(temp: &TempDir, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = temp.path().join(format!("File{:02}.swift", i));
                let body = "ALPHA\nBETA\n".repeat(i % 3 + 1);
                std::fs::write(&path, body).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_file_then_detector_order() {
        let detectors: Vec<Box<dyn FileDetector>> =
            vec![Box::new(Marker("BETA")), Box::new(LineCounter)];
        let findings =
            run_file_detectors(&detectors, "A.swift", "ALPHA\nBETA\nBETA\n").unwrap();
        let rules: Vec<&str> = findings.iter().map(|f| f.rule()).collect();
        assert_eq!(rules, vec!["BETA", "BETA", "LineCounter"]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let temp = TempDir::new().unwrap();
        let files = write_files(&temp, 24);
        let detectors: Vec<Box<dyn FileDetector>> = vec![
            Box::new(Marker("ALPHA")),
            Box::new(LineCounter),
            Box::new(Marker("BETA")),
        ];

        let sequential = Runner::new(temp.path())
            .parallel(false)
            .run_files(&detectors, &files)
            .unwrap();
        let parallel = Runner::new(temp.path())
            .parallel(true)
            .run_files(&detectors, &files)
            .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(sequential[0].file(), "File00.swift");
        assert_eq!(sequential.last().unwrap().file(), "File23.swift");
    }

    #[test]
    fn test_detector_error_aborts_run() {
        let temp = TempDir::new().unwrap();
        let files = write_files(&temp, 3);
        let detectors: Vec<Box<dyn FileDetector>> = vec![Box::new(LineCounter), Box::new(Failing)];

        let err = Runner::new(temp.path())
            .run_files(&detectors, &files)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot evaluate File00.swift");
    }

    #[test]
    fn test_unreadable_file_aborts_run() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("Gone.swift");
        let detectors: Vec<Box<dyn FileDetector>> = vec![Box::new(LineCounter)];

        let err = Runner::new(temp.path())
            .parallel(false)
            .run_files(&detectors, &[missing])
            .unwrap_err();
        assert!(err.to_string().contains("Gone.swift"));
    }

    #[test]
    fn test_project_detectors_follow_file_detectors() {
        let temp = TempDir::new().unwrap();
        let files = write_files(&temp, 2);
        let set = DetectorSet {
            file: vec![Box::new(LineCounter)],
            project: vec![Box::new(crate::detect::rules::TestCoverageDetector::new(
                1,
                0,
                crate::config::ScanConfig::default(),
            ))],
        };

        let findings = Runner::new(temp.path()).run(&set, &files).unwrap();
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[2].rule(), "TestCoverage");
    }
}
