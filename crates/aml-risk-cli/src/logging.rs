use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr subscriber. stdout carries command output only.
///
/// Reads `RUST_LOG`, then `AMLR_LOG`; otherwise `warn`, or `debug` with `--verbose`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("AMLR_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
