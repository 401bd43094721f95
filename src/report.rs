//! Output formatting for review results.
//!
//! Supports three output formats:
//! - Markdown: PR comment / CI artifact
//! - JSON: structured output for programmatic consumption
//! - Pretty: colored terminal output for human readability

use std::fmt::Write as _;
use std::io::{self, Write};
use std::str::FromStr;

use anyhow::Context;
use colored::*;
use serde::{Deserialize, Serialize};

use crate::ai::AiSummary;
use crate::detect::{severity_counts, Finding, Severity};
use crate::gate::{Decision, GateReport, PerfComparison, SizeReport};

/// Machine- or human-readable report text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Markdown,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Ok(Format::Markdown),
            "json" => Ok(Format::Json),
            _ => Err(format!("unknown report format: {}", s)),
        }
    }
}

/// Render `report` with its `decision`.
pub fn render(report: &GateReport, decision: &Decision, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Markdown => Ok(render_markdown(report, decision)),
        Format::Json => render_json(report, decision),
    }
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub passed: bool,
    pub summary: Option<AiSummary>,
    pub findings: Vec<JsonFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerfComparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeReport>,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonFinding {
    pub rule: String,
    pub severity: String,
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl From<&Finding> for JsonFinding {
    fn from(f: &Finding) -> Self {
        Self {
            rule: f.rule().to_string(),
            severity: f.severity().to_string(),
            file: f.file().to_string(),
            line: f.line(),
            message: f.message().to_string(),
        }
    }
}

impl JsonFinding {
    pub fn to_finding(&self) -> anyhow::Result<Finding> {
        let severity: Severity = self.severity.parse().map_err(anyhow::Error::msg)?;
        Ok(Finding::new(
            self.rule.clone(),
            severity,
            self.file.clone(),
            self.line,
            self.message.clone(),
        ))
    }
}

impl JsonReport {
    pub fn new(report: &GateReport, decision: &Decision) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            passed: decision.passed,
            summary: report.ai_summary.clone(),
            findings: report.findings.iter().map(JsonFinding::from).collect(),
            performance: report.perf.clone(),
            size: report.size.clone(),
            failures: decision.failures.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// The findings as typed values, in report order.
    pub fn findings(&self) -> anyhow::Result<Vec<Finding>> {
        self.findings.iter().map(JsonFinding::to_finding).collect()
    }
}

fn render_json(report: &GateReport, decision: &Decision) -> anyhow::Result<String> {
    let json = serde_json::to_string_pretty(&JsonReport::new(report, decision))?;
    Ok(json)
}

/// Parse a report produced by the JSON renderer.
pub fn parse_json(text: &str) -> anyhow::Result<JsonReport> {
    serde_json::from_str(text).context("Failed to parse JSON report")
}

// =============================================================================
// Markdown Format
// =============================================================================

fn status_mark(passes: bool) -> &'static str {
    if passes {
        "✅ PASS"
    } else {
        "❌ FAIL"
    }
}

fn render_markdown(report: &GateReport, decision: &Decision) -> String {
    let mut out = String::from("# Code Review Report\n\n");

    if let Some(ai) = &report.ai_summary {
        let _ = write!(out, "## AI Summary: {}\n\n{}\n\n---\n", ai.title, ai.body);
    }

    let _ = writeln!(out, "## Findings ({})", report.findings.len());
    for f in &report.findings {
        let _ = writeln!(
            out,
            "- **[{}] {}** – {}  `{}:{}`",
            f.severity().as_str().to_uppercase(),
            f.rule(),
            f.message(),
            f.file(),
            f.line()
        );
    }

    if let Some(perf) = &report.perf {
        out.push_str(&perf_markdown(perf));
    }

    if let Some(size) = &report.size {
        out.push_str("\n\n## App Size Report\n");
        out.push_str(&size_markdown(size));
    }

    let _ = write!(out, "\n\n## Result\n- {}\n", status_mark(decision.passed));
    for failure in &decision.failures {
        let _ = writeln!(out, "- {}", failure);
    }
    out
}

fn perf_markdown(perf: &PerfComparison) -> String {
    let mut out = String::from("\n\n## Performance Comparison\n");
    let _ = writeln!(out, "- Passes: {}", if perf.passes { "✅" } else { "❌" });
    let _ = writeln!(
        out,
        "- Sources: baseline {} → current {}",
        perf.baseline.source, perf.current.source
    );
    if perf.regressions.is_empty() {
        out.push_str("- No perf regressions against baseline\n");
    } else {
        for r in &perf.regressions {
            let _ = writeln!(out, "- {}", r);
        }
    }
    out
}

/// Size report section body.
pub fn size_markdown(report: &SizeReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "**Artifact:** `{}`", report.artifact_path);
    let _ = write!(out, "**Current:** {:.2} MB", report.current_mb);
    if let Some(base) = report.baseline_mb {
        let _ = write!(out, "\n**Baseline:** {:.2} MB", base);
    }
    if let Some(d) = report.diff_mb {
        let _ = write!(out, "\n**Diff:** {:+.2} MB", d);
    }
    if let Some(p) = report.diff_percent {
        let _ = write!(out, "\n**Diff %:** {:+.1}%", p);
    }
    let _ = write!(
        out,
        "\n\n**Status:** {}\n\n**Details:**\n",
        status_mark(report.passes)
    );
    for m in &report.messages {
        let _ = writeln!(out, "- {}", m);
    }
    out
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write colored terminal output.
pub fn write_pretty<W: Write>(
    out: &mut W,
    source_root: &str,
    report: &GateReport,
    decision: &Decision,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  {} v{}", "reviewgate".cyan().bold(), env!("CARGO_PKG_VERSION"))?;
    writeln!(out)?;
    writeln!(out, "  {}{}", "Scanning: ".dimmed(), source_root)?;
    writeln!(out)?;

    let (info, warn, error) = severity_counts(&report.findings);
    let status = if decision.passed {
        "✓ PASS".green()
    } else {
        "✗ FAIL".red()
    };
    writeln!(
        out,
        "  {}  {} error(s), {} warning(s), {} info",
        status, error, warn, info
    )?;
    writeln!(out)?;

    if let Some(ai) = &report.ai_summary {
        writeln!(out, "  {}", ai.title.bold())?;
        for line in ai.body.lines() {
            writeln!(out, "    {}", line)?;
        }
        writeln!(out)?;
    }

    if !report.findings.is_empty() {
        writeln!(out, "  {} ({}):", "Findings".bold(), report.findings.len())?;
        writeln!(out)?;
        for f in &report.findings {
            write_finding(out, f)?;
        }
    }

    if let Some(perf) = &report.perf {
        writeln!(out, "  {}", "Performance".bold())?;
        for delta in &perf.deltas {
            let change = format!("{:+.1}%", delta.change_percent);
            let change = if delta.regressed {
                change.red()
            } else {
                change.green()
            };
            writeln!(
                out,
                "    {:<14}{:.1}{} → {:.1}{}  {}  (limit +{:.1}%)",
                delta.metric,
                delta.baseline,
                delta.unit,
                delta.current,
                delta.unit,
                change,
                delta.limit_percent
            )?;
        }
        if perf.deltas.is_empty() {
            writeln!(out, "    {}", "no comparable metrics".dimmed())?;
        }
        writeln!(out)?;
    }

    if let Some(size) = &report.size {
        let status = if size.passes { "PASS".green() } else { "FAIL".red() };
        writeln!(out, "  {}  {}", "App Size".bold(), status)?;
        for m in &size.messages {
            writeln!(out, "    {}", m)?;
        }
        writeln!(out)?;
    }

    for failure in &decision.failures {
        writeln!(out, "  {} {}", "✗".red(), failure)?;
    }
    Ok(())
}

fn write_finding<W: Write>(out: &mut W, f: &Finding) -> io::Result<()> {
    let tag = match f.severity() {
        Severity::Error => "ERROR".red(),
        Severity::Warning => "WARN ".yellow(),
        Severity::Info => "INFO ".blue(),
    };
    write!(out, "    {}   {:<16}", tag, f.rule().dimmed())?;
    write!(out, "{}", f.file().blue())?;
    if f.line() > 0 {
        write!(out, "{}", format!(":{}", f.line()).dimmed())?;
    }
    writeln!(out)?;
    writeln!(out, "            {}", f.message())?;
    writeln!(out)
}
