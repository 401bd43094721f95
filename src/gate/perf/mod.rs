//! Performance regression gate.
//!
//! Three independent readers normalize measurements into a
//! [`PerfMetricSummary`]:
//! - result bundles, queried through an external tool ([`xcresult`])
//! - trace exports in CSV or JSON form ([`trace`])
//! - free-form text logs ([`textlog`])
//!
//! A field that could not be read stays `None`; zero is a real measurement.

pub mod textlog;
pub mod trace;
pub mod xcresult;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use xcresult::{ResultBundleReader, ToolError};

/// Tolerance applied to metrics without an override.
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 5.0;

/// Which reader produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerfSource {
    #[serde(rename = "xcresulttool")]
    ResultBundle,
    #[serde(rename = "xctrace-csv")]
    TraceCsv,
    #[serde(rename = "xctrace-json")]
    TraceJson,
    #[serde(rename = "text")]
    TextLog,
}

impl PerfSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerfSource::ResultBundle => "xcresulttool",
            PerfSource::TraceCsv => "xctrace-csv",
            PerfSource::TraceJson => "xctrace-json",
            PerfSource::TextLog => "text",
        }
    }
}

impl fmt::Display for PerfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized performance measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfMetricSummary {
    pub launch_mean_ms: Option<f64>,
    pub launch_std_ms: Option<f64>,
    pub cpu_mean_sec: Option<f64>,
    pub memory_mean_mb: Option<f64>,
    pub dropped_frames: Option<u64>,
    pub jank_events: Option<u64>,
    pub source: PerfSource,
}

impl PerfMetricSummary {
    /// An empty summary tagged with `source`.
    pub fn new(source: PerfSource) -> Self {
        Self {
            launch_mean_ms: None,
            launch_std_ms: None,
            cpu_mean_sec: None,
            memory_mean_mb: None,
            dropped_frames: None,
            jank_events: None,
            source,
        }
    }

    /// True when no field was measured.
    pub fn is_empty(&self) -> bool {
        self.launch_mean_ms.is_none()
            && self.launch_std_ms.is_none()
            && self.cpu_mean_sec.is_none()
            && self.memory_mean_mb.is_none()
            && self.dropped_frames.is_none()
            && self.jank_events.is_none()
    }
}

/// A metric the gate compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    LaunchMean,
    CpuMean,
    MemoryMean,
}

impl Metric {
    /// Compared metrics, in report order.
    pub const ALL: [Metric; 3] = [Metric::LaunchMean, Metric::CpuMean, Metric::MemoryMean];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::LaunchMean => "launch.mean",
            Metric::CpuMean => "cpu.mean",
            Metric::MemoryMean => "memory.mean",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::LaunchMean => "ms",
            Metric::CpuMean => "s",
            Metric::MemoryMean => "MB",
        }
    }

    pub fn value(&self, summary: &PerfMetricSummary) -> Option<f64> {
        match self {
            Metric::LaunchMean => summary.launch_mean_ms,
            Metric::CpuMean => summary.cpu_mean_sec,
            Metric::MemoryMean => summary.memory_mean_mb,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Invalid `key=percent` tolerance override.
#[derive(Debug, Error, PartialEq)]
pub enum ToleranceError {
    #[error("unknown perf metric '{0}' (expected launch.mean, cpu.mean or memory.mean)")]
    UnknownMetric(String),
    #[error("invalid tolerance '{0}' (expected key=percent)")]
    Malformed(String),
    #[error("invalid percent '{value}' for {key}")]
    InvalidPercent { key: String, value: String },
}

impl FromStr for Metric {
    type Err = ToleranceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.key() == s)
            .ok_or_else(|| ToleranceError::UnknownMetric(s.to_string()))
    }
}

/// Percent increase allowed per metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Tolerances {
    limits: BTreeMap<Metric, f64>,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            limits: Metric::ALL
                .into_iter()
                .map(|m| (m, DEFAULT_TOLERANCE_PERCENT))
                .collect(),
        }
    }
}

impl Tolerances {
    /// Defaults with each `key=percent` entry applied on top.
    pub fn with_overrides<S: AsRef<str>>(overrides: &[S]) -> Result<Self, ToleranceError> {
        let mut tolerances = Self::default();
        for raw in overrides {
            let (metric, percent) = Self::parse_override(raw.as_ref())?;
            tolerances.set(metric, percent);
        }
        Ok(tolerances)
    }

    /// Parse one `key=percent` entry.
    pub fn parse_override(raw: &str) -> Result<(Metric, f64), ToleranceError> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| ToleranceError::Malformed(raw.to_string()))?;
        let metric: Metric = key.trim().parse()?;
        let percent = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| ToleranceError::InvalidPercent {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            })?;
        Ok((metric, percent))
    }

    pub fn set(&mut self, metric: Metric, percent: f64) {
        self.limits.insert(metric, percent);
    }

    pub fn get(&self, metric: Metric) -> f64 {
        self.limits
            .get(&metric)
            .copied()
            .unwrap_or(DEFAULT_TOLERANCE_PERCENT)
    }
}

/// Baseline-to-current change for one compared metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: String,
    pub unit: String,
    pub baseline: f64,
    pub current: f64,
    pub change_percent: f64,
    pub limit_percent: f64,
    pub regressed: bool,
}

/// Outcome of comparing two summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfComparison {
    pub baseline: PerfMetricSummary,
    pub current: PerfMetricSummary,
    pub regressions: Vec<String>,
    pub deltas: Vec<MetricDelta>,
    pub passes: bool,
}

/// Compare `current` against `baseline`.
///
/// A metric is compared only when both sides measured it and the baseline
/// is positive. Only increases beyond the tolerance count as regressions.
pub fn compare(
    current: &PerfMetricSummary,
    baseline: &PerfMetricSummary,
    tolerances: &Tolerances,
) -> PerfComparison {
    let mut regressions = Vec::new();
    let mut deltas = Vec::new();

    for metric in Metric::ALL {
        let (Some(c), Some(b)) = (metric.value(current), metric.value(baseline)) else {
            debug!(metric = metric.key(), "metric missing on one side, skipped");
            continue;
        };
        if b <= 0.0 {
            debug!(metric = metric.key(), baseline = b, "non-positive baseline, skipped");
            continue;
        }

        let pct = (c - b) / b * 100.0;
        let limit = tolerances.get(metric);
        let regressed = pct > limit;
        if regressed {
            let unit = metric.unit();
            regressions.push(format!(
                "{} regressed by +{:.1}% (baseline {:.1}{} → current {:.1}{}; limit +{:.1}%)",
                metric.key(),
                pct,
                b,
                unit,
                c,
                unit,
                limit
            ));
        }
        deltas.push(MetricDelta {
            metric: metric.key().to_string(),
            unit: metric.unit().to_string(),
            baseline: b,
            current: c,
            change_percent: pct,
            limit_percent: limit,
            regressed,
        });
    }

    PerfComparison {
        baseline: baseline.clone(),
        current: current.clone(),
        passes: regressions.is_empty(),
        regressions,
        deltas,
    }
}

/// Read a trace export or text log, whichever yields measurements.
///
/// Returns `None` when the file cannot be read.
pub fn read_perf_file<P: AsRef<Path>>(path: P) -> Option<PerfMetricSummary> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read perf file");
            return None;
        }
    };

    if let Some(summary) = trace::parse(&text).filter(|s| !s.is_empty()) {
        debug!(path = %path.display(), source = %summary.source, "read trace export");
        return Some(summary);
    }
    let summary = textlog::parse(&text);
    debug!(path = %path.display(), empty = summary.is_empty(), "read text log");
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(ms: f64) -> PerfMetricSummary {
        PerfMetricSummary {
            launch_mean_ms: Some(ms),
            ..PerfMetricSummary::new(PerfSource::TextLog)
        }
    }

    #[test]
    fn test_regression_over_limit() {
        let cmp = compare(&launch(106.0), &launch(100.0), &Tolerances::default());
        assert!(!cmp.passes);
        assert_eq!(cmp.regressions.len(), 1);
        assert_eq!(
            cmp.regressions[0],
            "launch.mean regressed by +6.0% (baseline 100.0ms → current 106.0ms; limit +5.0%)"
        );
        assert!((cmp.deltas[0].change_percent - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_within_limit_passes() {
        let cmp = compare(&launch(104.0), &launch(100.0), &Tolerances::default());
        assert!(cmp.passes);
        assert!(cmp.regressions.is_empty());
        assert_eq!(cmp.deltas.len(), 1);
        assert!(!cmp.deltas[0].regressed);
    }

    #[test]
    fn test_absent_metric_never_regresses() {
        let mut current = PerfMetricSummary::new(PerfSource::TextLog);
        current.memory_mean_mb = Some(50.0);
        let baseline = PerfMetricSummary::new(PerfSource::TextLog);

        let cmp = compare(&current, &baseline, &Tolerances::default());
        assert!(cmp.passes);
        assert!(cmp.deltas.is_empty());
    }

    #[test]
    fn test_improvement_is_not_regression() {
        let cmp = compare(&launch(50.0), &launch(100.0), &Tolerances::default());
        assert!(cmp.passes);
        assert!(cmp.deltas[0].change_percent < 0.0);
    }

    #[test]
    fn test_zero_baseline_skipped() {
        let cmp = compare(&launch(10.0), &launch(0.0), &Tolerances::default());
        assert!(cmp.passes);
        assert!(cmp.deltas.is_empty());
    }

    #[test]
    fn test_overrides_merge_with_defaults() {
        let tol = Tolerances::with_overrides(&["cpu.mean=10", "launch.mean = 2.5"]).unwrap();
        assert_eq!(tol.get(Metric::CpuMean), 10.0);
        assert_eq!(tol.get(Metric::LaunchMean), 2.5);
        assert_eq!(tol.get(Metric::MemoryMean), DEFAULT_TOLERANCE_PERCENT);
    }

    #[test]
    fn test_override_errors() {
        assert_eq!(
            Tolerances::parse_override("disk.mean=5"),
            Err(ToleranceError::UnknownMetric("disk.mean".to_string()))
        );
        assert!(matches!(
            Tolerances::parse_override("cpu.mean"),
            Err(ToleranceError::Malformed(_))
        ));
        assert!(matches!(
            Tolerances::parse_override("cpu.mean=fast"),
            Err(ToleranceError::InvalidPercent { .. })
        ));
        assert!(matches!(
            Tolerances::parse_override("cpu.mean=-2"),
            Err(ToleranceError::InvalidPercent { .. })
        ));
    }

    #[test]
    fn test_units_in_messages() {
        let mut base = PerfMetricSummary::new(PerfSource::TraceCsv);
        base.cpu_mean_sec = Some(1.0);
        base.memory_mean_mb = Some(100.0);
        let mut cur = base.clone();
        cur.cpu_mean_sec = Some(2.0);
        cur.memory_mean_mb = Some(120.0);

        let cmp = compare(&cur, &base, &Tolerances::default());
        assert_eq!(cmp.regressions.len(), 2);
        assert!(cmp.regressions[0].starts_with("cpu.mean regressed by +100.0%"));
        assert!(cmp.regressions[0].contains("1.0s → current 2.0s"));
        assert!(cmp.regressions[1].contains("100.0MB → current 120.0MB"));
    }
}
