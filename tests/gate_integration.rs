//! End-to-end tests of the gates and the final decision.

use std::path::PathBuf;

use reviewgate::config::Config;
use reviewgate::detect::{Finding, Severity};
use reviewgate::diff::{self, DiffIndex};
use reviewgate::gate::perf::{self, Tolerances};
use reviewgate::gate::size::SizeBudget;
use reviewgate::gate::{decide, FailureReason, GateReport};
use reviewgate::pipeline::{PerfInput, PerfOptions, Pipeline, PipelineOptions, SizeOptions};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn app_options() -> PipelineOptions {
    let root = testdata_path().join("app");
    let files = reviewgate::scan::collect_files(&root, &Default::default()).unwrap();
    PipelineOptions {
        source_root: root,
        files,
        ..Default::default()
    }
}

fn pipeline() -> Pipeline {
    Pipeline::new(Config::default()).with_provider(None)
}

#[test]
fn test_diff_fixture_attribution() {
    let files = diff::load(testdata_path().join("change.diff")).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "Sources/ApiClient.swift");
    assert_eq!(files[0].added_lines.iter().copied().collect::<Vec<_>>(), vec![4]);

    let index = DiffIndex::new(files);
    assert!(index.is_changed("Sources/ApiClient.swift", 4));
    assert!(!index.is_changed("Sources/ApiClient.swift", 7));
}

#[test]
fn test_changed_only_scopes_file_findings() {
    let options = PipelineOptions {
        diff: Some(testdata_path().join("change.diff")),
        changed_only: true,
        ..app_options()
    };
    let review = pipeline().run(&options).unwrap();

    let file_findings: Vec<&Finding> = review
        .findings
        .iter()
        .filter(|f| f.rule() != "TestCoverage")
        .collect();
    assert_eq!(file_findings.len(), 1);
    assert_eq!(file_findings[0].rule(), "Security");
    assert_eq!(file_findings[0].line(), 4);
    assert!(review.findings.iter().any(|f| f.rule() == "TestCoverage"));
}

#[test]
fn test_changed_only_never_adds_findings() {
    let all = pipeline().run(&app_options()).unwrap();
    let scoped = pipeline()
        .run(&PipelineOptions {
            diff: Some(testdata_path().join("change.diff")),
            changed_only: true,
            ..app_options()
        })
        .unwrap();
    assert!(scoped.findings.iter().all(|f| all.findings.contains(f)));
}

#[test]
fn test_warnings_alone_pass() {
    let review = pipeline().run(&app_options()).unwrap();
    assert!(!review.findings.is_empty());
    assert!(review.decide().passed);
}

#[test]
fn test_perf_regression_fails_gate() {
    let temp = TempDir::new().unwrap();
    let options = PipelineOptions {
        source_root: temp.path().to_path_buf(),
        perf: Some(PerfOptions {
            current: PerfInput::File(testdata_path().join("perf/current.log")),
            baseline: Some(testdata_path().join("perf/baseline.csv")),
            tolerances: Tolerances::default(),
        }),
        ..Default::default()
    };
    let review = pipeline().run(&options).unwrap();
    let comparison = review.perf.as_ref().expect("perf gate should run");

    assert!(!comparison.passes);
    assert_eq!(comparison.regressions.len(), 1);
    assert!(comparison.regressions[0].starts_with("launch.mean regressed by +8.0%"));

    let decision = review.decide();
    assert!(!decision.passed);
    assert_eq!(
        decision.failures,
        vec![FailureReason::PerfRegression { regressions: 1 }]
    );
}

#[test]
fn test_perf_tolerance_override_passes() {
    let tolerances = Tolerances::with_overrides(&["launch.mean=10"]).unwrap();
    let current = perf::read_perf_file(testdata_path().join("perf/current.log")).unwrap();
    let baseline = perf::read_perf_file(testdata_path().join("perf/baseline.csv")).unwrap();
    let comparison = perf::compare(&current, &baseline, &tolerances);
    assert!(comparison.passes);
    assert_eq!(comparison.deltas.len(), 3);
}

#[test]
fn test_size_gate_with_artifact() {
    let temp = TempDir::new().unwrap();
    let artifact = temp.path().join("App.ipa");
    std::fs::write(&artifact, vec![0u8; 3 * 1024 * 1024]).unwrap();

    let run = |budget: SizeBudget| {
        pipeline()
            .run(&PipelineOptions {
                source_root: temp.path().to_path_buf(),
                size: Some(SizeOptions {
                    artifact: artifact.clone(),
                    baseline_mb: Some(2.0),
                    budget,
                }),
                ..Default::default()
            })
            .unwrap()
    };

    let within = run(SizeBudget {
        max_absolute_mb: Some(4.0),
        max_diff_mb: Some(1.5),
        ..Default::default()
    });
    let size = within.size.as_ref().unwrap();
    assert!(size.passes);
    assert_eq!(size.baseline_mb, Some(2.0));

    let over = run(SizeBudget {
        max_increase_percent: Some(25.0),
        ..Default::default()
    });
    assert!(!over.size.as_ref().unwrap().passes);
    assert!(over.decide().failures.contains(&FailureReason::SizeBudget));
}

#[test]
fn test_error_findings_fail_gate() {
    let report = GateReport::new(vec![
        Finding::new("Security", Severity::Warning, "A.swift", 1, "http"),
        Finding::new("Custom", Severity::Error, "B.swift", 2, "blocked"),
    ]);
    let decision = decide(&report);
    assert!(!decision.passed);
    assert_eq!(decision.failures, vec![FailureReason::ErrorFindings { count: 1 }]);
}
