//! Builds the enabled detector set from configuration.
//!
//! Detectors are listed in declaration order below; that order is the
//! order findings appear in for each file.

use tracing::{debug, warn};

use crate::config::{Config, RuleView};

use super::rules::{
    AccessibilityDetector, ConcurrencyDetector, NetworkingDetector, PerformanceDetector,
    SecurityDetector, TestCoverageDetector,
};
use super::{FileDetector, ProjectDetector};

type FileFactory = fn(&RuleView<'_>, &Config) -> Box<dyn FileDetector>;
type ProjectFactory = fn(&RuleView<'_>, &Config) -> Box<dyn ProjectDetector>;

struct FileEntry {
    key: &'static str,
    build: FileFactory,
}

struct ProjectEntry {
    key: &'static str,
    build: ProjectFactory,
}

fn accessibility(settings: &RuleView<'_>, _: &Config) -> Box<dyn FileDetector> {
    Box::new(AccessibilityDetector::from_settings(settings))
}

fn concurrency(settings: &RuleView<'_>, _: &Config) -> Box<dyn FileDetector> {
    Box::new(ConcurrencyDetector::from_settings(settings))
}

fn performance(settings: &RuleView<'_>, _: &Config) -> Box<dyn FileDetector> {
    Box::new(PerformanceDetector::from_settings(settings))
}

fn networking(settings: &RuleView<'_>, _: &Config) -> Box<dyn FileDetector> {
    Box::new(NetworkingDetector::from_settings(settings))
}

fn security(_: &RuleView<'_>, _: &Config) -> Box<dyn FileDetector> {
    Box::new(SecurityDetector::new())
}

fn test_coverage(settings: &RuleView<'_>, config: &Config) -> Box<dyn ProjectDetector> {
    Box::new(TestCoverageDetector::from_settings(settings, &config.scan))
}

static FILE_DETECTORS: &[FileEntry] = &[
    FileEntry {
        key: AccessibilityDetector::CONFIG_KEY,
        build: accessibility,
    },
    FileEntry {
        key: ConcurrencyDetector::CONFIG_KEY,
        build: concurrency,
    },
    FileEntry {
        key: PerformanceDetector::CONFIG_KEY,
        build: performance,
    },
    FileEntry {
        key: NetworkingDetector::CONFIG_KEY,
        build: networking,
    },
    FileEntry {
        key: SecurityDetector::CONFIG_KEY,
        build: security,
    },
];

static PROJECT_DETECTORS: &[ProjectEntry] = &[ProjectEntry {
    key: TestCoverageDetector::CONFIG_KEY,
    build: test_coverage,
}];

/// The active detectors for one run.
pub struct DetectorSet {
    pub file: Vec<Box<dyn FileDetector>>,
    pub project: Vec<Box<dyn ProjectDetector>>,
}

impl DetectorSet {
    /// Names of all active detectors, file detectors first.
    pub fn names(&self) -> Vec<&'static str> {
        self.file
            .iter()
            .map(|d| d.name())
            .chain(self.project.iter().map(|d| d.name()))
            .collect()
    }
}

/// Config keys of every built-in detector, in declaration order.
pub fn known_keys() -> impl Iterator<Item = &'static str> {
    FILE_DETECTORS
        .iter()
        .map(|e| e.key)
        .chain(PROJECT_DETECTORS.iter().map(|e| e.key))
}

fn settings_for<'a>(config: &'a Config, key: &'a str) -> Option<RuleView<'a>> {
    let view = config.rule(key);
    if !view.enabled() {
        debug!(rule = key, "detector disabled by config");
        return None;
    }
    if view.is_malformed() {
        warn!(
            rule = key,
            "malformed rule settings, building detector with defaults"
        );
    }
    Some(view)
}

/// Build the enabled file detectors in declaration order.
pub fn build_file_detectors(config: &Config) -> Vec<Box<dyn FileDetector>> {
    FILE_DETECTORS
        .iter()
        .filter_map(|entry| settings_for(config, entry.key).map(|s| (entry.build)(&s, config)))
        .collect()
}

/// Build the enabled project detectors in declaration order.
pub fn build_project_detectors(config: &Config) -> Vec<Box<dyn ProjectDetector>> {
    PROJECT_DETECTORS
        .iter()
        .filter_map(|entry| settings_for(config, entry.key).map(|s| (entry.build)(&s, config)))
        .collect()
}

/// Build both detector lists.
pub fn build(config: &Config) -> DetectorSet {
    for key in config.rules.keys() {
        if !known_keys().any(|k| k == key) {
            debug!(rule = %key, "ignoring settings for unknown detector");
        }
    }

    DetectorSet {
        file: build_file_detectors(config),
        project: build_project_detectors(config),
    }
}
