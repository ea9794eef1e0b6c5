use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FOOTPRINT_LOG";

/// Sends diagnostics to stderr so stdout stays parseable with `--json`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
