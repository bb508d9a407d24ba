//! Console logging for host runs.
//!
//! Installs a `tracing_subscriber` fmt subscriber writing to stderr.  The
//! library logs through the `log` facade; the subscriber's `tracing-log`
//! bridge picks those records up.  Filtering follows `EnvFilter` directives
//! read from `IRRIGATION_LOG` (`debug`, `irrigation::processor=trace`, ...),
//! defaulting to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LEVEL_ENV: &str = "IRRIGATION_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Build a filter from `directives`, falling back to `info` when they are
/// missing or do not parse.
pub fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber.  Fails if one is already set.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = filter_from(std::env::var(LEVEL_ENV).ok().as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}
