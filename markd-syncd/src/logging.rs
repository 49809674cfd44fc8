use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `markd_syncd=debug`.
pub const LOG_FILTER_ENV: &str = "MARKD_SYNC_LOG";
const DEFAULT_FILTER: &str = "info";

pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // A subscriber may already be installed (tests, embedding binaries).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
