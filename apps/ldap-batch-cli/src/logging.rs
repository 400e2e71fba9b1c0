//! Log output setup
//!
//! Logs go to stderr so that stdout stays reserved for the result table.

use tracing_subscriber::EnvFilter;

/// Default filter directive for the given verbosity flags.
///
/// `RUST_LOG`, when set, takes precedence.
pub fn default_directive(verbose: bool, debug: bool) -> &'static str {
    if debug {
        "ldap_batch=debug,ldap_batch_cli=debug"
    } else if verbose {
        "ldap_batch=info,ldap_batch_cli=info"
    } else {
        "warn"
    }
}

/// Install the global tracing subscriber.
pub fn init(verbose: bool, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
