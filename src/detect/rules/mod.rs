//! Built-in detectors.
//!
//! The file detectors scan source text line by line with plain string
//! heuristics; none of them parse the language.

mod accessibility;
mod concurrency;
mod networking;
mod performance;
mod security;
mod test_coverage;

pub use accessibility::AccessibilityDetector;
pub use concurrency::ConcurrencyDetector;
pub use networking::NetworkingDetector;
pub use performance::PerformanceDetector;
pub use security::SecurityDetector;
pub use test_coverage::TestCoverageDetector;
