//! Log subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "MGMT_PATCH_LOG";

/// Install a `fmt` subscriber filtered by the directives in `env`
/// (e.g. `MGMT_PATCH_LOG=mgmt_patch=debug`), writing to stderr.
///
/// Only warnings are shown when the variable is unset. Calling this more
/// than once keeps the first subscriber.
pub fn initialize_logging(env: &str) {
    let filter = EnvFilter::try_from_env(env).unwrap_or_else(|_| EnvFilter::new("warn"));
    // An already-installed global subscriber wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
