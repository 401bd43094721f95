//! Regression gates and the overall pass/fail decision.

pub mod decision;
pub mod perf;
pub mod size;

pub use decision::{decide, Decision, FailureReason, GateReport};
pub use perf::{compare, read_perf_file, PerfComparison, PerfMetricSummary, Tolerances};
pub use size::{SizeBudget, SizeReport};
