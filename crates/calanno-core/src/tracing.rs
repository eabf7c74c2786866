//! Logging setup for the calanno binaries.
//!
//! [`init_tracing`] installs the global `tracing` subscriber. Filtering
//! honors `RUST_LOG` when it is set; otherwise the calanno crates log at
//! the configured default level and everything else stays quiet.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// The global subscriber was already set for this process.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, human-readable.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per event, for scraped logs.
    Json,
}

/// Subscriber configuration. Normally taken from a preset; the fields
/// stay public for one-off tweaks.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level enabled for the calanno crates when `RUST_LOG` is unset.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Render the file and line of the callsite.
    pub include_location: bool,
    /// Render the module path of the callsite.
    pub include_target: bool,
    pub include_timestamp: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            include_location: false,
            include_target: true,
            include_timestamp: true,
        }
    }
}

impl TracingConfig {
    /// Preset for `--debug` runs: compact lines with callsite locations
    /// and no timestamps.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            output_format: TracingOutputFormat::Compact,
            include_location: true,
            include_target: true,
            include_timestamp: false,
        }
    }
}

fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "calanno={level},calanno_core={level},calanno_datasource={level},calanno_cli={level}"
        ))
    })
}

/// Installs the global tracing subscriber.
///
/// Call once at process start; the global subscriber can only be set
/// once, and a second call reports [`TracingError::SetGlobalSubscriber`].
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let base = fmt::layer()
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    let layer = match config.output_format {
        TracingOutputFormat::Pretty => base.pretty().boxed(),
        TracingOutputFormat::Compact if config.include_timestamp => base.compact().boxed(),
        TracingOutputFormat::Compact => base.compact().without_time().boxed(),
        TracingOutputFormat::Json => base.json().boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(default_filter(config.default_level))
        .with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_pretty_at_info() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::INFO);
        assert_eq!(config.output_format, TracingOutputFormat::Pretty);
        assert!(!config.include_location);
        assert!(config.include_target);
        assert!(config.include_timestamp);
    }

    #[test]
    fn debug_preset_swaps_timestamps_for_locations() {
        let config = TracingConfig::cli_debug();
        assert_eq!(config.default_level, Level::DEBUG);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(config.include_location);
        assert!(!config.include_timestamp);
    }
}
