//! Trace export summaries (`xctrace export` CSV or JSON).

use serde_json::Value;

use super::{PerfMetricSummary, PerfSource};

fn number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn count(value: f64) -> Option<u64> {
    (value >= 0.0).then_some(value as u64)
}

/// Parse a trace export, trying JSON first and then CSV.
///
/// Returns `None` when the text is neither.
pub fn parse(text: &str) -> Option<PerfMetricSummary> {
    if let Ok(json) = serde_json::from_str::<Value>(text) {
        return Some(parse_json(&json));
    }
    if text.contains(',') && text.contains('\n') {
        return Some(parse_csv(text));
    }
    None
}

/// Parse `Metric,Mean[,Std]` rows. Cells that are not numbers leave the
/// field unset.
pub fn parse_csv(text: &str) -> PerfMetricSummary {
    let mut summary = PerfMetricSummary::new(PerfSource::TraceCsv);

    for row in text.lines() {
        let cols: Vec<&str> = row.split(',').collect();
        if cols.len() < 2 {
            continue;
        }
        let key = cols[0].trim().to_lowercase();
        let mean = number(cols[1]);

        if key.contains("launch") {
            if mean.is_some() {
                summary.launch_mean_ms = mean;
            }
            if let Some(std) = cols.get(2).and_then(|c| number(c)) {
                summary.launch_std_ms = Some(std);
            }
        } else if key.contains("cpu") {
            if mean.is_some() {
                summary.cpu_mean_sec = mean;
            }
        } else if key.contains("memory") {
            if mean.is_some() {
                summary.memory_mean_mb = mean;
            }
        } else if key.contains("dropped") || key.contains("frames") {
            if let Some(n) = mean.and_then(count) {
                summary.dropped_frames = Some(n);
            }
        } else if key.contains("jank") {
            if let Some(n) = mean.and_then(count) {
                summary.jank_events = Some(n);
            }
        }
    }

    summary
}

/// Scan a JSON export for numeric fields whose key names a known metric.
pub fn parse_json(json: &Value) -> PerfMetricSummary {
    let mut summary = PerfMetricSummary::new(PerfSource::TraceJson);
    scan(json, &mut summary);
    summary
}

fn scan(value: &Value, summary: &mut PerfMetricSummary) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                match v.as_f64() {
                    Some(n) => apply(&key.to_lowercase(), n, summary),
                    None => scan(v, summary),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| scan(v, summary)),
        _ => {}
    }
}

fn apply(key: &str, n: f64, summary: &mut PerfMetricSummary) {
    if key.contains("launch") && key.contains("mean") {
        summary.launch_mean_ms = Some(n);
    }
    if key.contains("launch") && key.contains("std") {
        summary.launch_std_ms = Some(n);
    }
    if key.contains("cpu") && key.contains("mean") {
        summary.cpu_mean_sec = Some(n);
    }
    if key.contains("memory") && key.contains("mean") {
        summary.memory_mean_mb = Some(n);
    }
    if key.contains("dropped") || key.contains("frames") {
        summary.dropped_frames = count(n).or(summary.dropped_frames);
    }
    if key.contains("jank") {
        summary.jank_events = count(n).or(summary.jank_events);
    }
}
