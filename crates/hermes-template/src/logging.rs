//! `tracing` subscriber setup for the CLI.
//!
//! Logs go to stderr so stdout carries only the rendered prompt or report.
//! `RUST_LOG` takes precedence over the level passed to [`init`].

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber. `default_level` is an `EnvFilter`
/// directive such as `"warn"` or `"hermes_template=debug"`.
pub fn init(default_level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| format!("invalid log level '{default_level}': {e}"))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| format!("failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_level() {
        // Only meaningful when RUST_LOG is unset; otherwise the env wins.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(init("hermes_template=loud").is_err());
        }
    }
}
