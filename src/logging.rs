//! Logging configuration using tracing.
//!
//! Diagnostics go to stderr so scan output on stdout stays pipeable.

use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// Multi-line output with span context.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
    /// Include module paths in events.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: LogFormat::Compact,
            with_target: false,
        }
    }
}

impl LogConfig {
    /// Derive the level from the `-v` / `-q` command-line flags.
    pub fn from_verbosity(verbose: bool, quiet: bool) -> Self {
        let level = if quiet {
            "warn"
        } else if verbose {
            "debug"
        } else {
            "info"
        };
        Self {
            level: level.to_string(),
            with_target: verbose,
            ..Self::default()
        }
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(config: LogConfig) {
    init_with_writer(config, std::io::stderr);
}

/// Install the global subscriber, writing events to `writer`.
pub fn init_with_writer<W>(config: LogConfig, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(writer)
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "logging already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LogConfig::from_verbosity(false, false).level, "info");
        assert_eq!(LogConfig::from_verbosity(true, false).level, "debug");
        // Quiet wins when both are given.
        assert_eq!(LogConfig::from_verbosity(true, true).level, "warn");
    }

    #[test]
    fn test_builder() {
        let config = LogConfig::default().level("trace").format(LogFormat::Pretty);
        assert_eq!(config.level, "trace");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_double_init_is_ignored() {
        // The test writer keeps events inside libtest's output capture.
        init_with_writer(LogConfig::default(), fmt::TestWriter::new());
        init_with_writer(
            LogConfig::default().format(LogFormat::Pretty),
            fmt::TestWriter::new(),
        );
        tracing::info!("logging initialised for tests");
    }
}
