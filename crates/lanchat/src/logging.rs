//! Log setup shared by both binaries.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber writing to stderr.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects `debug`, and the
/// default is `info` for the server and `warn` for the client so that log
/// lines do not interleave with the chat prompt.
pub fn init(verbose: bool, quiet_default: bool) {
    let fallback = match (verbose, quiet_default) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
