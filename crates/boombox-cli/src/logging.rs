//! Structured logging setup
//!
//! Activation:
//!   - Environment variable: RUST_LOG=debug (or trace)
//!   - CLI flag: --debug
//!
//! Output goes to stderr so table and CSV output on stdout stays clean.

use tracing_subscriber::EnvFilter;

/// Level used when neither RUST_LOG nor --debug is given
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Initialise the logging subsystem.
///
/// Priority: RUST_LOG env var > --debug flag > default "warn".
pub fn init(debug_flag: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Logging initialised");
}
