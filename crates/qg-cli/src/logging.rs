//! Subscriber setup
//!
//! Logs go to stderr so JSON verdicts on stdout stay machine-readable.
//! Filtering follows `RUST_LOG`, defaulting to `info`.

use crate::cli::LogFormat;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; later calls are ignored
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        tracing::debug!("Subscriber already installed");
    }
}
