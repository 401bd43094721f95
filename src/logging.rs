//! Invocation-scoped log dispatch.
//!
//! Nothing here installs a global subscriber. Callers hand the returned
//! [`Dispatch`] to the pipeline, which enters it for the duration of a run.

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Env var holding an `EnvFilter` directive that overrides `-v`.
pub const LOG_ENV: &str = "REVIEWGATE_LOG";

/// Filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "reviewgate=warn",
        1 => "reviewgate=info",
        _ => "reviewgate=debug",
    }
}

fn filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Build a dispatch that writes to stderr, filtered by `REVIEWGATE_LOG`
/// or the verbosity level.
pub fn dispatch(verbosity: u8) -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .finish();
    Dispatch::new(subscriber)
}
