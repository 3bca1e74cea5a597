//! Log subscriber setup.
//!
//! Logs go to stderr so that `--format json` output on stdout stays
//! machine-readable. `RUST_LOG` wins over the verbosity flags.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Verbosity;
use crate::error::{CliError, CliResult};

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Filter from `RUST_LOG`, falling back to the verbosity default
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()))
}

/// Install the global subscriber
pub fn init(verbosity: Verbosity, format: LogFormat, ansi: bool) -> CliResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter(verbosity));
    let installed = match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(ansi)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.map_err(|e| CliError::logging(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format_is_text() {
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_second_init_is_an_error() {
        // Either this call or an earlier one in the same process owns the
        // global subscriber; a second install must fail cleanly.
        let _ = init(Verbosity::Normal, LogFormat::Text, false);
        let err = init(Verbosity::Debug, LogFormat::Json, false).unwrap_err();
        assert!(matches!(err, CliError::Logging { .. }));
    }
}
