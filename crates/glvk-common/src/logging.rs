use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "GLVK_LOG";

/// Filter from `GLVK_LOG`, or `default` when it is unset or unparsable.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize structured logging with environment filter.
/// Set GLVK_LOG=debug (or trace, info, warn, error) for verbosity control.
///
/// Later calls leave the first subscriber in place.
pub fn init_logging() {
    let _ = fmt()
        .with_env_filter(env_filter("info"))
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}
