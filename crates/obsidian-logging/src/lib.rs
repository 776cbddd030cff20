//! Structured logging for the Obsidian tools
//!
//! Console output goes to stderr so command output on stdout stays
//! machine-readable. An optional JSONL file keeps an audit trail of every
//! provisioning and bundling run.
//!
//! # Quick Start
//!
//! ```ignore
//! use obsidian_logging::{LogConfig, ObsidianSubscriberBuilder};
//!
//! // Human-readable console output at info
//! let _guard = ObsidianSubscriberBuilder::new().try_init()?;
//!
//! // Debug output plus a JSONL audit log
//! let _guard = ObsidianSubscriberBuilder::new()
//!     .with_config(LogConfig::development().with_audit_log("build/logs"))
//!     .try_init()?;
//! ```
//!
//! Keep the returned guard alive until exit, or buffered file output is lost.

pub mod config;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};

use std::fs::{self, OpenOptions};
use std::io::IsTerminal;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Log file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Builder for configuring and initializing the global subscriber
pub struct ObsidianSubscriberBuilder {
    config: LogConfig,
}

impl ObsidianSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Build the level filter: `RUST_LOG` wins, then the default level,
    /// then per-target overrides.
    ///
    /// The default level must be a plain level (`off`, `error` .. `trace`);
    /// anything else is rejected rather than silently dropped.
    pub fn build_filter(&self) -> Result<EnvFilter, LoggingError> {
        let default_level = &self.config.default_level;
        let level = default_level.parse::<LevelFilter>().map_err(|e| {
            LoggingError::InvalidDirective {
                directive: default_level.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

        for directive in self.config.target_directives() {
            let parsed = directive.parse::<Directive>().map_err(|e| {
                LoggingError::InvalidDirective {
                    directive: directive.clone(),
                    reason: e.to_string(),
                }
            })?;
            filter = filter.add_directive(parsed);
        }

        Ok(filter)
    }

    /// Install the subscriber globally.
    ///
    /// Returns the file writer guard when file output is configured.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let filter = self.build_filter()?;
        let console = &self.config.console;
        let jsonl = &self.config.jsonl;

        let pretty_console = (console.enabled && console.pretty).then(|| {
            fmt::layer()
                .with_ansi(use_ansi(console.ansi, std::io::stderr().is_terminal()))
                .with_target(true)
                .with_writer(std::io::stderr)
        });

        let jsonl_console = (console.enabled && !console.pretty).then(|| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(jsonl.include_spans)
                .flatten_event(jsonl.flatten_events)
                .with_file(jsonl.include_location)
                .with_line_number(jsonl.include_location)
                .with_writer(std::io::stderr)
        });

        let mut guard = None;
        let jsonl_file = match &self.config.file {
            Some(file_config) => {
                let (writer, file_guard) = file_writer(file_config)?;
                guard = Some(file_guard);
                Some(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(jsonl.include_spans)
                        .flatten_event(jsonl.flatten_events)
                        .with_file(jsonl.include_location)
                        .with_line_number(jsonl.include_location)
                        .with_writer(writer),
                )
            }
            None => None,
        };

        Registry::default()
            .with(filter)
            .with(pretty_console)
            .with(jsonl_console)
            .with(jsonl_file)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for ObsidianSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Colors only when configured and stderr is an interactive terminal
fn use_ansi(configured: bool, stderr_is_terminal: bool) -> bool {
    configured && stderr_is_terminal
}

fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let writer = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_appender::non_blocking(file)
        }
        RotationStrategy::Daily => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::DAILY,
            &config.directory,
            &config.prefix,
        )),
        RotationStrategy::Hourly => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::HOURLY,
            &config.directory,
            &config.prefix,
        )),
    };

    Ok(writer)
}

/// Initialize logging for testing (minimal output, ignores a second call)
pub fn init_testing() {
    let _ = ObsidianSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = ObsidianSubscriberBuilder::new();
        assert_eq!(builder.config().default_level, "info");
        assert!(builder.config().console.pretty);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = ObsidianSubscriberBuilder::new().with_config(LogConfig::ci());
        assert!(!builder.config().console.pretty);
    }

    #[test]
    fn test_builder_with_level() {
        let builder = ObsidianSubscriberBuilder::new().with_level("trace");
        assert_eq!(builder.config().default_level, "trace");
    }

    #[test]
    fn test_builder_with_console() {
        let builder = ObsidianSubscriberBuilder::new().with_console(false);
        assert!(!builder.config().console.enabled);
    }

    #[test]
    fn test_invalid_target_directive() {
        let mut config = LogConfig::default();
        config.targets.insert("obsidian_bundle".into(), "not-a-level".into());

        let result = ObsidianSubscriberBuilder::new().with_config(config).build_filter();
        assert!(matches!(result, Err(LoggingError::InvalidDirective { .. })));
    }

    #[test]
    fn test_invalid_default_level() {
        let result = ObsidianSubscriberBuilder::new().with_level("verbose").build_filter();
        match result {
            Err(LoggingError::InvalidDirective { directive, .. }) => {
                assert_eq!(directive, "verbose")
            }
            other => panic!("expected InvalidDirective, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_default_levels_accepted() {
        for level in ["off", "error", "warn", "info", "debug", "trace", "WARN"] {
            assert!(
                ObsidianSubscriberBuilder::new().with_level(level).build_filter().is_ok(),
                "level {} rejected",
                level
            );
        }
    }

    #[test]
    fn test_builder_with_file_output() {
        let file = FileConfig {
            directory: "build/logs".into(),
            prefix: "release".to_string(),
            rotation: RotationStrategy::Never,
        };
        let builder = ObsidianSubscriberBuilder::new().with_file_output(file.clone());
        assert_eq!(builder.config().file, Some(file));
    }

    #[test]
    fn test_file_writer_never_rotation() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = FileConfig {
            directory: dir.path().join("logs"),
            prefix: "audit".to_string(),
            rotation: RotationStrategy::Never,
        };

        let (_writer, _guard) = file_writer(&file).unwrap();
        assert!(dir.path().join("logs").join("audit.log").exists());
    }

    #[test]
    fn test_ansi_requires_terminal() {
        assert!(use_ansi(true, true));
        assert!(!use_ansi(true, false));
        assert!(!use_ansi(false, true));
    }

    #[test]
    fn test_init_testing_twice() {
        init_testing();
        init_testing();
        tracing::warn!("logging initialized for tests");
    }

    #[test]
    fn test_valid_target_directive() {
        let mut config = LogConfig::default();
        config.targets.insert("obsidian_bundle".into(), "debug".into());

        assert!(ObsidianSubscriberBuilder::new().with_config(config).build_filter().is_ok());
    }
}
