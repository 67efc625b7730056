//! Logging setup, used by the main entrypoint.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default filter directive for the requested verbosity.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialize tracing on stderr at the given verbosity.
///
/// `RUST_LOG`, when set, takes precedence over `verbose`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(fmt_layer).init();
}
