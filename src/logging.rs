use std::io;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so JSON on stdout stays clean.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` for our own
/// targets when `verbose` is on.
pub fn configure_logging(verbose: bool) {
    let default_filter = if verbose {
        "info,event_atlas=debug,geocode=debug,pipeline=debug,llm=debug,server=debug"
    } else {
        "info,ureq=warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_log = fmt::layer().with_writer(io::stderr).with_target(true).with_filter(filter);

    // Already installed when embedded or under test.
    let _ = tracing_subscriber::registry().with(stderr_log).try_init();
}
