//! Tests for the report formats produced from a full review run.
//!
//! The JSON report is the machine-readable contract: these tests check its
//! field names and that findings survive a render/parse cycle intact.

use std::path::PathBuf;

use reviewgate::scan::collect_files;
use reviewgate::config::{Config, ScanConfig};
use reviewgate::gate::GateReport;
use reviewgate::pipeline::{Pipeline, PipelineOptions};
use reviewgate::report::{self, Format};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn run_review() -> GateReport {
    let root = testdata_path().join("app");
    let files = collect_files(&root, &ScanConfig::default()).expect("should collect fixture files");
    Pipeline::new(Config::default())
        .run(&PipelineOptions {
            source_root: root,
            files,
            ..Default::default()
        })
        .expect("review should succeed")
}

#[test]
fn test_json_report_fields() {
    let review = run_review();
    let decision = review.decide();
    let json = report::render(&review, &decision, Format::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(value["passed"], true);
    assert!(value["findings"].is_array());
    assert!(value["failures"].as_array().unwrap().is_empty());
    assert_eq!(value["summary"]["title"], "Code Review Summary (Local)");

    let first = &value["findings"][0];
    for key in ["rule", "severity", "file", "line", "message"] {
        assert!(first.get(key).is_some(), "finding is missing {:?}", key);
    }
}

#[test]
fn test_json_findings_round_trip() {
    let review = run_review();
    let json = report::render(&review, &review.decide(), Format::Json).unwrap();
    let parsed = report::parse_json(&json).unwrap();
    assert_eq!(parsed.findings().unwrap(), review.findings);
}

#[test]
fn test_json_omits_gates_that_did_not_run() {
    let review = run_review();
    let json = report::render(&review, &review.decide(), Format::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value.get("performance").is_none());
    assert!(value.get("size").is_none());
}

#[test]
fn test_markdown_lists_every_finding() {
    let review = run_review();
    let md = report::render(&review, &review.decide(), Format::Markdown).unwrap();

    assert!(md.starts_with("# Code Review Report"));
    assert!(md.contains(&format!("## Findings ({})", review.findings.len())));
    assert!(md.contains("`Sources/ApiClient.swift:4`"));
    assert_eq!(md.matches("\n- **[").count(), review.findings.len());
    assert!(md.contains("## Result\n- ✅ PASS"));
}

#[test]
fn test_parse_json_rejects_garbage() {
    assert!(report::parse_json("{\"passed\": true}").is_err());
    assert!(report::parse_json("not json").is_err());
}
