//! Result bundles queried through `xcrun xcresulttool`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use phf::phf_map;
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{PerfMetricSummary, PerfSource};

/// Default wall-clock limit for one tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Failure invoking the external result tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {seconds}s")]
    Timeout { program: String, seconds: u64 },
    #[error("{program} exited with status {code:?}: {stderr}")]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("unreadable output from {program}: {message}")]
    Output { program: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    LaunchMean,
    LaunchStd,
    CpuMean,
    MemoryMean,
}

/// Known metric keys. Rank 0 names are preferred over rank 1 aliases.
static METRIC_KEYS: phf::Map<&'static str, (Field, u8)> = phf_map! {
    "XCTApplicationLaunchMetric.meanMs" => (Field::LaunchMean, 0),
    "launch.meanMs" => (Field::LaunchMean, 1),
    "XCTApplicationLaunchMetric.stdMs" => (Field::LaunchStd, 0),
    "launch.stdMs" => (Field::LaunchStd, 1),
    "XCTCPUMetric.meanSec" => (Field::CpuMean, 0),
    "cpu.meanSec" => (Field::CpuMean, 1),
    "XCTMemoryMetric.meanMB" => (Field::MemoryMean, 0),
    "memory.meanMB" => (Field::MemoryMean, 1),
};

/// Keys that name a test in the bundle JSON.
const NAME_KEYS: &[&str] = &["name", "identifier", "testName"];

/// Reads perf metrics from a result bundle via an external tool.
#[derive(Debug, Clone)]
pub struct ResultBundleReader {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    test_filter: Option<String>,
}

impl Default for ResultBundleReader {
    fn default() -> Self {
        Self {
            program: "xcrun".to_string(),
            args: ["xcresulttool", "get", "--format", "json", "--path"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout: DEFAULT_TOOL_TIMEOUT,
            test_filter: None,
        }
    }
}

impl ResultBundleReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tool. The bundle path is appended after `args`.
    pub fn program(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.args = args;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Only read metrics under tests whose name contains `filter`.
    pub fn test_filter(mut self, filter: Option<String>) -> Self {
        self.test_filter = filter.filter(|f| !f.is_empty());
        self
    }

    /// Run the tool on `bundle` and parse its JSON output.
    pub fn query(&self, bundle: &Path) -> Result<Value, ToolError> {
        let runtime = tokio::runtime::Runtime::new().map_err(|e| ToolError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;
        runtime.block_on(self.query_async(bundle))
    }

    async fn query_async(&self, bundle: &Path) -> Result<Value, ToolError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(bundle)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ToolError::Output {
                program: self.program.clone(),
                message: e.to_string(),
            })?,
            Err(_) => {
                return Err(ToolError::Timeout {
                    program: self.program.clone(),
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(ToolError::ExitStatus {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| ToolError::Output {
            program: self.program.clone(),
            message: e.to_string(),
        })
    }

    /// Read a summary from `bundle`; any tool failure yields `None`.
    pub fn read(&self, bundle: &Path) -> Option<PerfMetricSummary> {
        match self.query(bundle) {
            Ok(json) => {
                let summary = extract(&json, self.test_filter.as_deref());
                if summary.is_empty() {
                    warn!(bundle = %bundle.display(), "no perf metrics found in result bundle");
                }
                Some(summary)
            }
            Err(e) => {
                warn!(bundle = %bundle.display(), error = %e, "result bundle query failed, perf gate skipped");
                None
            }
        }
    }
}

/// Unwrap typed `{"_value": ...}` wrappers.
fn unwrap_typed(value: &Value) -> &Value {
    match value.get("_value") {
        Some(inner) => inner,
        None => value,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match unwrap_typed(value) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn names_test(map: &serde_json::Map<String, Value>, filter: &str) -> bool {
    NAME_KEYS.iter().any(|key| {
        map.get(*key)
            .and_then(|v| unwrap_typed(v).as_str())
            .is_some_and(|name| name.contains(filter))
    })
}

#[derive(Default)]
struct Found {
    // (value, rank) per field
    slots: [Option<(f64, u8)>; 4],
}

impl Found {
    fn offer(&mut self, field: Field, rank: u8, value: f64) {
        let idx = field as usize;
        let replace = match self.slots[idx] {
            Some((_, existing)) => rank < existing,
            None => true,
        };
        if replace {
            self.slots[idx] = Some((value, rank));
        }
    }

    fn get(&self, field: Field) -> Option<f64> {
        self.slots[field as usize].map(|(v, _)| v)
    }
}

fn scan(value: &Value, filter: Option<&str>, found: &mut Found) {
    match value {
        Value::Object(map) => {
            // Once inside a matching test, everything below is in scope.
            let filter = match filter {
                Some(f) if names_test(map, f) => None,
                other => other,
            };
            for (key, v) in map {
                if filter.is_none() {
                    if let Some(&(field, rank)) = METRIC_KEYS.get(key.as_str()) {
                        if let Some(n) = as_number(v) {
                            found.offer(field, rank, n);
                            continue;
                        }
                    }
                }
                scan(v, filter, found);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| scan(v, filter, found)),
        _ => {}
    }
}

/// Extract known metrics from result-bundle JSON.
pub fn extract(json: &Value, test_filter: Option<&str>) -> PerfMetricSummary {
    let mut found = Found::default();
    scan(json, test_filter, &mut found);
    debug!(filter = ?test_filter, "extracted result bundle metrics");

    PerfMetricSummary {
        launch_mean_ms: found.get(Field::LaunchMean),
        launch_std_ms: found.get(Field::LaunchStd),
        cpu_mean_sec: found.get(Field::CpuMean),
        memory_mean_mb: found.get(Field::MemoryMean),
        ..PerfMetricSummary::new(PerfSource::ResultBundle)
    }
}
