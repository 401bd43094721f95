//! One review run: detectors, diff scoping, regression gates, summary.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{dispatcher, info, warn, Dispatch};

use crate::ai::{self, SuggestionProvider};
use crate::config::Config;
use crate::detect::{self, run_project_detectors, Runner};
use crate::diff::{self, DiffFile, DiffIndex};
use crate::gate::perf::{self, ResultBundleReader, Tolerances};
use crate::gate::size::{self, SizeBudget};
use crate::gate::GateReport;
use crate::paths;

/// Where the current perf measurement comes from.
#[derive(Debug, Clone)]
pub enum PerfInput {
    /// A result bundle queried through the external tool.
    ResultBundle {
        bundle: PathBuf,
        test_filter: Option<String>,
        tool_timeout: Duration,
    },
    /// A trace export or text log.
    File(PathBuf),
}

/// Perf comparison inputs.
#[derive(Debug, Clone)]
pub struct PerfOptions {
    pub current: PerfInput,
    pub baseline: Option<PathBuf>,
    pub tolerances: Tolerances,
}

/// Size gate inputs.
#[derive(Debug, Clone)]
pub struct SizeOptions {
    pub artifact: PathBuf,
    pub baseline_mb: Option<f64>,
    pub budget: SizeBudget,
}

/// Inputs for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub source_root: PathBuf,
    /// Files to scan, in report order.
    pub files: Vec<PathBuf>,
    pub diff: Option<PathBuf>,
    /// Drop file findings that are not on added lines.
    pub changed_only: bool,
    pub sequential: bool,
    pub perf: Option<PerfOptions>,
    pub size: Option<SizeOptions>,
}

/// Runs the review stages in order and collects their results.
pub struct Pipeline {
    config: Config,
    dispatch: Dispatch,
    provider: Option<Box<dyn SuggestionProvider>>,
}

impl Pipeline {
    /// A pipeline using the provider configured in `config.ai`.
    pub fn new(config: Config) -> Self {
        let provider = ai::provider_for(&config.ai);
        Self {
            config,
            dispatch: dispatcher::get_default(|d| d.clone()),
            provider,
        }
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Replace the summary provider; `None` disables the summary.
    pub fn with_provider(mut self, provider: Option<Box<dyn SuggestionProvider>>) -> Self {
        self.provider = provider;
        self
    }

    /// Run every stage. Detector and diff failures abort the run; gate
    /// inputs that cannot be read only skip that gate.
    pub fn run(&self, options: &PipelineOptions) -> anyhow::Result<GateReport> {
        dispatcher::with_default(&self.dispatch, || self.run_inner(options))
    }

    fn run_inner(&self, options: &PipelineOptions) -> anyhow::Result<GateReport> {
        let diff_files: Option<Vec<DiffFile>> = match &options.diff {
            Some(path) => Some(diff::load(path)?),
            None => None,
        };

        let set = detect::build(&self.config);
        let runner = Runner::new(&options.source_root)
            .parallel(!options.sequential)
            .with_dispatch(self.dispatch.clone());

        let mut findings = runner.run_files(&set.file, &options.files)?;
        info!(files = options.files.len(), findings = findings.len(), "file detectors finished");

        if options.changed_only {
            match &diff_files {
                Some(files) => {
                    let index = DiffIndex::new(files.clone());
                    let scanned: Vec<String> = options
                        .files
                        .iter()
                        .map(|f| paths::relativize(f, &options.source_root))
                        .collect();
                    if !files.is_empty() && !index.matches_any(scanned.iter().map(String::as_str)) {
                        warn!(
                            root = %options.source_root.display(),
                            diff_files = files.len(),
                            "no diff path matches a scanned file; diff paths must be relative to the source root"
                        );
                    }
                    let before = findings.len();
                    findings = index.filter_findings(findings);
                    info!(kept = findings.len(), dropped = before - findings.len(), "scoped findings to changed lines");
                }
                None => warn!("--changed-only given without a diff, keeping all findings"),
            }
        }

        findings.extend(run_project_detectors(&set.project, &options.source_root)?);

        let perf = options.perf.as_ref().and_then(run_perf);
        let size = options.size.as_ref().and_then(|s| {
            size::evaluate_path(&s.artifact, s.baseline_mb, &s.budget)
        });

        let ai_summary = self.provider.as_deref().and_then(|provider| {
            ai::summarize_best_effort(provider, &findings, diff_files.as_deref())
        });

        Ok(GateReport {
            findings,
            ai_summary,
            perf,
            size,
        })
    }
}

fn run_perf(options: &PerfOptions) -> Option<perf::PerfComparison> {
    let current = match &options.current {
        PerfInput::ResultBundle {
            bundle,
            test_filter,
            tool_timeout,
        } => ResultBundleReader::new()
            .timeout(*tool_timeout)
            .test_filter(test_filter.clone())
            .read(bundle)?,
        PerfInput::File(path) => perf::read_perf_file(path)?,
    };

    let Some(baseline_path) = options.baseline.as_ref() else {
        warn!("no perf baseline given, perf gate skipped");
        return None;
    };
    let baseline = perf::read_perf_file(baseline_path)?;

    let comparison = perf::compare(&current, &baseline, &options.tolerances);
    info!(passes = comparison.passes, regressions = comparison.regressions.len(), "perf gate evaluated");
    Some(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Severity;
    use tempfile::TempDir;

    fn write(root: &std::path::Path, rel: &str, body: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Config::default()).with_provider(None)
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn dispatch(&self) -> Dispatch {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::WARN)
                .finish();
            Dispatch::new(subscriber)
        }

        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_changed_only_keeps_project_findings() {
        let temp = TempDir::new().unwrap();
        let file = write(
            temp.path(),
            "Api.swift",
            "let a = \"http://a.test\"\nlet b = \"http://b.test\"\n",
        );
        let diff = write(temp.path(), "change.diff", "+++ b/Api.swift\n@@ -1 +2,1 @@\n+let b = \"http://b.test\"\n");

        let report = pipeline()
            .run(&PipelineOptions {
                source_root: temp.path().to_path_buf(),
                files: vec![file],
                diff: Some(diff),
                changed_only: true,
                ..Default::default()
            })
            .unwrap();

        let security: Vec<_> = report.findings.iter().filter(|f| f.rule() == "Security").collect();
        assert_eq!(security.len(), 1);
        assert_eq!(security[0].line(), 2);
        assert!(report.findings.iter().any(|f| f.rule() == "TestCoverage"));
    }

    #[test]
    fn test_diff_from_other_root_is_reported() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("App");
        let file = write(&root, "Sources/Api.swift", "let a = \"http://a.test\"\n");
        let diff = write(
            temp.path(),
            "change.diff",
            "+++ b/App/Sources/Api.swift\n@@ -0,0 +1,1 @@\n+let a = \"http://a.test\"\n",
        );

        let logs = Captured::default();
        let report = pipeline()
            .with_dispatch(logs.dispatch())
            .run(&PipelineOptions {
                source_root: root,
                files: vec![file],
                diff: Some(diff),
                changed_only: true,
                ..Default::default()
            })
            .unwrap();

        assert!(report.findings.iter().all(|f| f.rule() != "Security"));
        assert!(logs.text().contains("no diff path matches a scanned file"));
    }

    #[test]
    fn test_matching_diff_is_not_reported() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "Sources/Api.swift", "let a = \"http://a.test\"\n");
        let diff = write(
            temp.path(),
            "change.diff",
            "+++ b/Sources/Api.swift\n@@ -0,0 +1,1 @@\n+let a = \"http://a.test\"\n",
        );

        let logs = Captured::default();
        let report = pipeline()
            .with_dispatch(logs.dispatch())
            .run(&PipelineOptions {
                source_root: temp.path().to_path_buf(),
                files: vec![file],
                diff: Some(diff),
                changed_only: true,
                ..Default::default()
            })
            .unwrap();

        assert!(report.findings.iter().any(|f| f.rule() == "Security"));
        assert!(!logs.text().contains("no diff path matches"));
    }

    #[test]
    fn test_missing_diff_is_fatal() {
        let temp = TempDir::new().unwrap();
        let result = pipeline().run(&PipelineOptions {
            source_root: temp.path().to_path_buf(),
            diff: Some(temp.path().join("missing.diff")),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_unreadable_gate_inputs_skip_gates() {
        let temp = TempDir::new().unwrap();
        let report = pipeline()
            .run(&PipelineOptions {
                source_root: temp.path().to_path_buf(),
                perf: Some(PerfOptions {
                    current: PerfInput::File(temp.path().join("current.log")),
                    baseline: Some(temp.path().join("baseline.log")),
                    tolerances: Tolerances::default(),
                }),
                size: Some(SizeOptions {
                    artifact: temp.path().join("App.ipa"),
                    baseline_mb: None,
                    budget: SizeBudget::default(),
                }),
                ..Default::default()
            })
            .unwrap();
        assert!(report.perf.is_none());
        assert!(report.size.is_none());
    }

    #[test]
    fn test_perf_files_compared() {
        let temp = TempDir::new().unwrap();
        let current = write(temp.path(), "current.csv", "Metric,Mean,Std\nLaunch,530,10\n");
        let baseline = write(temp.path(), "baseline.log", "launch mean: 500 ms\n");

        let report = pipeline()
            .run(&PipelineOptions {
                source_root: temp.path().to_path_buf(),
                perf: Some(PerfOptions {
                    current: PerfInput::File(current),
                    baseline: Some(baseline),
                    tolerances: Tolerances::default(),
                }),
                ..Default::default()
            })
            .unwrap();

        let perf = report.perf.unwrap();
        assert!(!perf.passes);
        assert!(perf.regressions[0].starts_with("launch.mean regressed by +6.0%"));
    }

    #[test]
    fn test_local_summary_attached() {
        let temp = TempDir::new().unwrap();
        let file = write(temp.path(), "Img.swift", "Image(\"logo\")\n");
        let report = Pipeline::new(Config::default())
            .run(&PipelineOptions {
                source_root: temp.path().to_path_buf(),
                files: vec![file],
                sequential: true,
                ..Default::default()
            })
            .unwrap();

        assert!(report
            .findings
            .iter()
            .any(|f| f.rule() == "Accessibility" && f.severity() == Severity::Warning));
        assert_eq!(report.ai_summary.unwrap().title, "Code Review Summary (Local)");
    }
}
