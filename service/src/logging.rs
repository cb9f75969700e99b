use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Dependencies whose logs are hidden below Trace level.
const FILTERED_MODULES: &[&str] = &["sqlx", "sea_orm", "tower", "tracing", "hyper", "axum"];

pub struct Logger {}

impl Logger {
    /// Initializes the global logger at the configured level.
    ///
    /// Dependency logs from `FILTERED_MODULES` are only shown at Trace.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        Self::init(config.log_level_filter, TerminalMode::Mixed)
    }

    /// Like `init_logger`, but every level goes to stderr so stdout carries only
    /// program output.
    pub fn init_stderr_logger(config: &Config) -> Result<(), SetLoggerError> {
        Self::init(config.log_level_filter, TerminalMode::Stderr)
    }

    fn init(level: LevelFilter, mode: TerminalMode) -> Result<(), SetLoggerError> {
        let log_config = Self::build_log_config(Self::should_filter_dependencies(level));
        TermLogger::init(level, log_config, mode, ColorChoice::Auto)
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_and_http_stacks_are_filtered() {
        for module in ["sqlx", "sea_orm", "hyper", "axum"] {
            assert!(
                FILTERED_MODULES.contains(&module),
                "{module} should be filtered"
            );
        }
    }

    #[test]
    fn only_trace_shows_dependency_logs() {
        assert!(!Logger::should_filter_dependencies(LevelFilter::Trace));

        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(
                Logger::should_filter_dependencies(level),
                "{level} should filter dependency logs"
            );
        }
    }

    #[test]
    fn log_config_builds_with_and_without_filters() {
        let _filtered = Logger::build_log_config(true);
        let _unfiltered = Logger::build_log_config(false);
    }
}
