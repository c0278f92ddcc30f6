use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable overriding the log filter (EnvFilter syntax)
pub const ENV_LOG_VAR: &str = "TRANSFER_RANK_LOG";

/// Filter used when TRANSFER_RANK_LOG is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "transfer_rank=debug,warn"
    } else {
        "warn"
    }
}

/// Install the stderr subscriber. Safe to call once per process.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(ENV_LOG_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
