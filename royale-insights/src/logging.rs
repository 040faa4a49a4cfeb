//! How much a pipeline run says, and where it says it.
//!
//! Node failures, marker outcomes and missing columns are always reported.
//! [`LogConfig`] gates the two chatty streams: per-node scheduling (which
//! inputs a node reads, which artifact it writes) and catalog file traffic.
//! [`setup`] is for binaries only; the library never installs a subscriber.

use tracing::Level;

/// Verbosity of the runner and the data catalog.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Emit a `debug` event with inputs and output before each node runs
    pub log_stage_details: bool,
    /// Emit an `info` event for every catalog file loaded or saved
    pub log_data_operations: bool,
    /// Cap on error texts in node-failure events
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_stage_details: false,
            log_data_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Node scheduling and catalog traffic, long error texts.
    pub fn verbose() -> Self {
        Self {
            log_stage_details: true,
            log_data_operations: true,
            max_field_length: 1024,
        }
    }

    /// Failures and warnings only.
    pub fn quiet() -> Self {
        Self {
            log_stage_details: false,
            log_data_operations: false,
            max_field_length: 128,
        }
    }

    /// Preset matching a crate log level: `debug` and `trace` show node
    /// scheduling, `warn` and `error` drop catalog traffic.
    pub fn for_level(level: Level) -> Self {
        if level >= Level::DEBUG {
            Self::verbose()
        } else if level <= Level::WARN {
            Self::quiet()
        } else {
            Self::default()
        }
    }
}

/// Logs a node-scheduling event at `debug` when
/// [`LogConfig::log_stage_details`] is set.
#[macro_export]
macro_rules! log_stage {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_stage_details {
            tracing::debug!(target: "royale_insights::pipeline", $($arg)*);
        }
    };
}

/// Logs a catalog load or save at `info` when
/// [`LogConfig::log_data_operations`] is set.
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations {
            tracing::info!(target: "royale_insights::catalog", $($arg)*);
        }
    };
}

/// Cuts `value` to at most `max_length` bytes on a char boundary and marks
/// the cut.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let end = (0..=max_length)
        .rev()
        .find(|&i| value.is_char_boundary(i))
        .unwrap_or(0);
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber installation for `royale-report` and other binaries.
pub mod setup {
    use tracing::Level;

    /// Filter levels and output format of the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for DataFusion, Arrow and other dependencies
        pub level: Level,
        /// Level for the library and the `royale_report` binary
        pub crate_level: Level,
        /// One JSON object per event instead of text lines
        pub json_format: bool,
        /// Full filter directive replacing the two levels above
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                crate_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        pub fn with_crate_level(mut self, level: Level) -> Self {
            self.crate_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// `EnvFilter` directive, e.g. `warn,royale_insights=info,royale_report=info`.
        pub fn env_filter(&self) -> String {
            if let Some(filter) = &self.env_filter {
                return filter.clone();
            }
            let crate_level = self.crate_level.as_str().to_lowercase();
            format!(
                "{},royale_insights={crate_level},royale_report={crate_level}",
                self.level.as_str().to_lowercase(),
            )
        }
    }

    /// Installs the global subscriber, writing to stderr so that reports on
    /// stdout stay clean.
    ///
    /// `RUST_LOG` takes precedence over the configured filter. Fails if a
    /// subscriber is already installed.
    ///
    /// ```rust,no_run
    /// use royale_insights::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::default().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_default_logs_catalog_but_not_scheduling() {
        let config = LogConfig::default();
        assert!(!config.log_stage_details);
        assert!(config.log_data_operations);
        assert_eq!(config.max_field_length, 256);
    }

    #[test]
    fn test_presets_follow_crate_level() {
        assert!(LogConfig::for_level(Level::DEBUG).log_stage_details);
        assert!(LogConfig::for_level(Level::TRACE).log_stage_details);
        assert!(!LogConfig::for_level(Level::INFO).log_stage_details);
        assert!(LogConfig::for_level(Level::INFO).log_data_operations);
        assert!(!LogConfig::for_level(Level::WARN).log_data_operations);
        assert!(!LogConfig::for_level(Level::ERROR).log_data_operations);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("Column 'winner.tag' not found", 64), "Column 'winner.tag' not found");
        assert_eq!(
            truncate_field("Column 'winner.tag' not found", 6),
            "Column...(truncated)"
        );
    }

    #[test]
    fn test_truncate_field_respects_char_boundaries() {
        let truncated = truncate_field("ñññññ", 3);
        assert_eq!(truncated, "ñ...(truncated)");
    }

    #[test]
    fn test_env_filter_string() {
        let config = LoggingConfig::default().with_crate_level(Level::DEBUG);
        assert_eq!(
            config.env_filter(),
            "warn,royale_insights=debug,royale_report=debug"
        );

        let custom = LoggingConfig::default().with_env_filter("datafusion=info");
        assert_eq!(custom.env_filter(), "datafusion=info");
    }
}
