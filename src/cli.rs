//! Command-line interface for reviewgate.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::{dispatcher, info};

use crate::config;
use crate::gate::perf::Tolerances;
use crate::gate::size::SizeBudget;
use crate::logging;
use crate::pipeline::{PerfInput, PerfOptions, Pipeline, PipelineOptions, SizeOptions};
use crate::report::{self, Format};
use crate::scan::collect_files;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// CI review gate for Swift projects.
///
/// Runs source detectors over a project tree, optionally scoped to the
/// lines a diff adds, compares performance metrics and artifact size
/// against baselines, and exits non-zero when an error-severity finding
/// or a regression gate fails.
#[derive(Parser, Debug)]
#[command(name = "reviewgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source root to scan
    pub source_root: PathBuf,

    /// Output format: md, json, or pretty
    #[arg(short, long, default_value = "md", value_parser = ["md", "markdown", "json", "pretty"])]
    pub format: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Unified diff of the change under review
    #[arg(long)]
    pub diff: Option<PathBuf>,

    /// Only report file findings on lines the diff adds
    #[arg(long, requires = "diff")]
    pub changed_only: bool,

    /// YAML/JSON config path (default: $REVIEWGATE_CONFIG or auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Evaluate files on one thread
    #[arg(long)]
    pub sequential: bool,

    /// Result bundle to read current perf metrics from
    #[arg(long, conflicts_with = "perf_current")]
    pub xcresult: Option<PathBuf>,

    /// Only read perf metrics from tests whose name contains this
    #[arg(long, value_name = "NAME")]
    pub perf_test_filter: Option<String>,

    /// Trace export or text log with current perf metrics
    #[arg(long)]
    pub perf_current: Option<PathBuf>,

    /// Trace export or text log with baseline perf metrics
    #[arg(long)]
    pub perf_baseline: Option<PathBuf>,

    /// Allowed increase per metric, e.g. launch.mean=5 (repeatable)
    #[arg(long = "perf-tol", value_name = "KEY=PERCENT", action = ArgAction::Append)]
    pub perf_tol: Vec<String>,

    /// Seconds to wait for the result bundle tool
    #[arg(long, value_name = "SECONDS", default_value_t = 120)]
    pub perf_tool_timeout: u64,

    /// Build artifact to check against the size budget
    #[arg(long, visible_alias = "ipa")]
    pub artifact: Option<PathBuf>,

    /// Baseline artifact size in MB
    #[arg(long, value_name = "MB")]
    pub size_baseline: Option<f64>,

    /// Maximum artifact size in MB
    #[arg(long, value_name = "MB")]
    pub size_abs: Option<f64>,

    /// Maximum increase over the baseline in MB
    #[arg(long, value_name = "MB")]
    pub size_diff: Option<f64>,

    /// Maximum increase over the baseline in percent
    #[arg(long, value_name = "PERCENT")]
    pub size_pct: Option<f64>,
}

fn perf_options(cli: &Cli, tolerances: Tolerances) -> Option<PerfOptions> {
    let current = match (&cli.xcresult, &cli.perf_current) {
        (Some(bundle), _) => PerfInput::ResultBundle {
            bundle: bundle.clone(),
            test_filter: cli.perf_test_filter.clone(),
            tool_timeout: Duration::from_secs(cli.perf_tool_timeout),
        },
        (None, Some(path)) => PerfInput::File(path.clone()),
        (None, None) => return None,
    };
    Some(PerfOptions {
        current,
        baseline: cli.perf_baseline.clone(),
        tolerances,
    })
}

fn size_options(cli: &Cli) -> Option<SizeOptions> {
    cli.artifact.as_ref().map(|artifact| SizeOptions {
        artifact: artifact.clone(),
        baseline_mb: cli.size_baseline,
        budget: SizeBudget {
            max_absolute_mb: cli.size_abs,
            max_diff_mb: cli.size_diff,
            max_increase_percent: cli.size_pct,
        },
    })
}

/// Run a review. Returns the process exit code.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let dispatch = logging::dispatch(cli.verbose);
    dispatcher::with_default(&dispatch, || run_with(cli, dispatch.clone()))
}

fn run_with(cli: &Cli, dispatch: tracing::Dispatch) -> anyhow::Result<i32> {
    let tolerances = match Tolerances::with_overrides(&cli.perf_tol) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let (config, source) = match config::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    info!(config = %source, "configuration loaded");

    let abs_root = match cli.source_root.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", cli.source_root, e);
            return Ok(EXIT_ERROR);
        }
    };

    let (source_root, files) = if abs_root.is_dir() {
        let files = collect_files(&abs_root, &config.scan)?;
        (abs_root, files)
    } else {
        let parent = abs_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| abs_root.clone());
        (parent, vec![abs_root])
    };
    info!(root = %source_root.display(), files = files.len(), "collected source files");

    let options = PipelineOptions {
        source_root,
        files,
        diff: cli.diff.clone(),
        changed_only: cli.changed_only,
        sequential: cli.sequential,
        perf: perf_options(cli, tolerances),
        size: size_options(cli),
    };

    let gate_report = Pipeline::new(config)
        .with_dispatch(dispatch)
        .run(&options)?;
    let decision = gate_report.decide();

    let root_display = cli.source_root.to_string_lossy().to_string();
    match cli.format.as_str() {
        "pretty" => match &cli.out {
            Some(path) => {
                colored::control::set_override(false);
                let mut file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                report::write_pretty(&mut file, &root_display, &gate_report, &decision)?;
            }
            None => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                report::write_pretty(&mut lock, &root_display, &gate_report, &decision)?;
            }
        },
        other => {
            let format: Format = other.parse().map_err(anyhow::Error::msg)?;
            let text = report::render(&gate_report, &decision, format)?;
            match &cli.out {
                Some(path) => {
                    std::fs::write(path, &text)
                        .with_context(|| format!("Failed to write report to {}", path.display()))?;
                    info!(path = %path.display(), "report written");
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{}", text)?;
                }
            }
        }
    }

    if decision.passed {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}
