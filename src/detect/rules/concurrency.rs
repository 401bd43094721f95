//! Concurrency hints: main-thread JSON decoding and unisolated types.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::RuleView;
use crate::detect::{FileDetector, Finding, Severity};

lazy_static! {
    /// Type declaration with optional attributes and access modifiers.
    static ref TYPE_DECL: Regex = Regex::new(
        r"^(?:@\w+\s+)*(?:(?:public|private|internal|fileprivate|open|final|package)\s+)*(struct|class|actor)\s+(\w+)"
    ).unwrap();
}

/// Keywords that follow `class` in member declarations (`class func`, `class var`).
const CLASS_MEMBER_KEYWORDS: &[&str] = &["func", "var", "let", "subscript"];

#[derive(Debug, Clone)]
pub struct ConcurrencyDetector {
    warn_main_actor_blocking: bool,
    enforce_sendable: bool,
}

impl ConcurrencyDetector {
    pub const NAME: &'static str = "Concurrency";
    pub const CONFIG_KEY: &'static str = "concurrency";

    pub fn new(warn_main_actor_blocking: bool, enforce_sendable: bool) -> Self {
        Self {
            warn_main_actor_blocking,
            enforce_sendable,
        }
    }

    pub fn from_settings(settings: &RuleView<'_>) -> Self {
        Self::new(
            settings.extra("warnMainActorBlocking", true),
            settings.extra("enforceSendable", true),
        )
    }

    fn is_blocking_decode(line: &str) -> bool {
        line.contains("JSONDecoder().decode(")
            && !line.contains("Task.detached")
            && !line.contains("DispatchQueue.global().async")
    }

    /// Returns true for a type declaration that states no isolation.
    fn is_unisolated_type(line: &str) -> bool {
        let Some(caps) = TYPE_DECL.captures(line) else {
            return false;
        };
        let kind = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let ident = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        if kind == "class" && CLASS_MEMBER_KEYWORDS.contains(&ident) {
            return false;
        }
        if kind == "actor" {
            return false;
        }

        !(line.contains("Sendable") || line.contains("@MainActor"))
    }
}

impl Default for ConcurrencyDetector {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl FileDetector for ConcurrencyDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, path: &str, source: &str) -> anyhow::Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            let trimmed = line.trim();

            if self.warn_main_actor_blocking && Self::is_blocking_decode(trimmed) {
                findings.push(Finding::new(
                    Self::NAME,
                    Severity::Warning,
                    path,
                    idx + 1,
                    "Potential synchronous JSON decode on main. Move to Task.detached/background queue.",
                ));
            }

            if self.enforce_sendable && Self::is_unisolated_type(trimmed) {
                findings.push(Finding::new(
                    Self::NAME,
                    Severity::Info,
                    path,
                    idx + 1,
                    "Consider `Sendable` or actor/@MainActor isolation for concurrency-critical types.",
                ));
            }
        }

        Ok(findings)
    }
}
