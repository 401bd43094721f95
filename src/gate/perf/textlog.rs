//! Free-form text logs, e.g. printed `measure(metrics:)` output.

use lazy_static::lazy_static;
use regex::Regex;

use super::{PerfMetricSummary, PerfSource};

lazy_static! {
    static ref LAUNCH_MEAN: Regex =
        Regex::new(r"(?is)launch.*?mean[:=]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").unwrap();
    static ref LAUNCH_STD: Regex =
        Regex::new(r"(?is)launch.*?std(?:dev)?[:=]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").unwrap();
    static ref CPU_MEAN: Regex =
        Regex::new(r"(?is)cpu.*?mean[:=]\s*([0-9]+(?:\.[0-9]+)?)\s*s").unwrap();
    static ref MEMORY_MEAN: Regex =
        Regex::new(r"(?is)mem.*?mean[:=]\s*([0-9]+(?:\.[0-9]+)?)\s*mb").unwrap();
    static ref DROPPED_FRAMES: Regex =
        Regex::new(r"(?i)dropped[ _-]?frames[:=]\s*([0-9]+)").unwrap();
    static ref JANK_EVENTS: Regex =
        Regex::new(r"(?i)jank(?:[ _-]?events)?[:=]\s*([0-9]+)").unwrap();
}

fn first<T: std::str::FromStr>(re: &Regex, text: &str) -> Option<T> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract whatever metrics the log mentions. Never fails; unmatched
/// metrics stay absent.
pub fn parse(text: &str) -> PerfMetricSummary {
    PerfMetricSummary {
        launch_mean_ms: first(&LAUNCH_MEAN, text),
        launch_std_ms: first(&LAUNCH_STD, text),
        cpu_mean_sec: first(&CPU_MEAN, text),
        memory_mean_mb: first(&MEMORY_MEAN, text),
        dropped_frames: first(&DROPPED_FRAMES, text),
        jank_events: first(&JANK_EVENTS, text),
        source: PerfSource::TextLog,
    }
}
