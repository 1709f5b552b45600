//! Observability setup driven by the document's `log_verbosity`.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed, or installation failed.
    #[error("failed to install tracing subscriber: {reason}")]
    Install {
        /// Human-readable reason reported by `tracing-subscriber`.
        reason: String,
    },
}

/// Maps a verbosity level onto the most detailed events that are emitted.
///
/// `0` keeps errors only, `1` adds warnings, `2..=4` add progress, `5` adds
/// debug detail, and anything higher enables tracing.
#[must_use]
pub const fn level_for_verbosity(verbosity: usize) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2..=4 => LevelFilter::INFO,
        5 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Builds the event filter: `RUST_LOG` when set, else the verbosity level.
#[must_use]
pub fn filter_for_verbosity(verbosity: usize) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity).to_string()))
}

/// Installs a formatted global subscriber for `verbosity`.
///
/// # Errors
///
/// Returns [`TelemetryError::Install`] if a global subscriber is already set.
pub fn init(verbosity: usize) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for_verbosity(verbosity))
        .with_target(false)
        .try_init()
        .map_err(|err| TelemetryError::Install {
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for_verbosity(0), LevelFilter::ERROR);
        assert_eq!(level_for_verbosity(1), LevelFilter::WARN);
        assert_eq!(level_for_verbosity(4), LevelFilter::INFO);
        assert_eq!(level_for_verbosity(5), LevelFilter::DEBUG);
        assert_eq!(level_for_verbosity(9), LevelFilter::TRACE);
    }

    #[test]
    fn second_init_fails() {
        let _ = init(4);
        assert!(matches!(init(4), Err(TelemetryError::Install { .. })));
    }
}
