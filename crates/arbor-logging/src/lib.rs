//! Multi-node JSONL logging for Arbor
//!
//! One process may host a single radio node or a whole simulated mesh. This
//! crate sets up a `tracing` subscriber for either case:
//!
//! - **JSONL Output**: Structured JSON lines on the console (default)
//! - **Pretty Output**: Human-readable console output for development
//! - **File Output**: JSONL files with daily/hourly rotation via tracing-appender
//! - **Node Context**: Spans record which node (tree address and hardware
//!   address) produced them
//!
//! # Quick Start
//!
//! ```ignore
//! use arbor_logging::{ArborSubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! ArborSubscriberBuilder::new().init()?;
//!
//! // Development mode with pretty output
//! ArborSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init()?;
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Replaces the configured level and directives (e.g.
//!   `arbor_node=trace`)

pub mod config;
pub mod context;
pub mod layers;

pub use config::{
    ARBOR_CRATES, ConsoleConfig, ConsoleFormat, FileConfig, JsonlConfig, LogConfig,
    RotationStrategy,
};
pub use context::{NodeContextData, NodeContextGuard};
pub use layers::{NodeContextExtension, NodeContextLayer};

use std::fs::{self, File};
use std::io;

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::{Layer, Layered, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Registry};

/// Errors from subscriber setup
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to open log output: {0}")]
    Io(#[from] io::Error),

    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// The registry with the filter and context layers applied
type BaseSubscriber = Layered<NodeContextLayer, Layered<EnvFilter, Registry>>;

type BoxedLayer = Box<dyn Layer<BaseSubscriber> + Send + Sync>;

/// Builder for configuring and initializing the Arbor logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct ArborSubscriberBuilder {
    config: LogConfig,
}

impl ArborSubscriberBuilder {
    /// Default: JSONL output to console
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

    /// Set the level for targets no directive names
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Add a `target=level` directive, e.g. `arbor_crypto=trace`
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.config.directives.push(directive.into());
        self
    }

    /// Choose the console format, or turn the console off
    pub fn with_console_format(mut self, format: ConsoleFormat) -> Self {
        self.config.console.format = format;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration this builder will apply
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes file output when dropped and must be kept
    /// alive for the duration of the program. It is `None` without file
    /// output.
    pub fn init(self) -> Result<Option<WorkerGuard>, LogError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.filter()));

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        match self.config.console.format {
            ConsoleFormat::Json => layers.push(self.jsonl_layer(io::stdout)),
            ConsoleFormat::Pretty => layers.push(
                tracing_subscriber::fmt::layer()
                    .with_ansi(self.config.console.ansi)
                    .with_target(true)
                    .boxed(),
            ),
            ConsoleFormat::Off => {}
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(self.jsonl_layer(writer));
            guard = Some(file_guard);
        }

        Registry::default()
            .with(env_filter)
            .with(NodeContextLayer::new())
            .with(layers)
            .try_init()?;

        Ok(guard)
    }

    fn jsonl_layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
    {
        let jsonl = &self.config.jsonl;
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(jsonl.span_list)
            .flatten_event(jsonl.flatten)
            .with_file(jsonl.source_location)
            .with_line_number(jsonl.source_location)
            .with_thread_ids(jsonl.thread_ids)
            .with_writer(writer)
            .boxed()
    }
}

impl Default for ArborSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the file writer for `config`
///
/// `Never` truncates a single `<prefix>.log`; the rolling strategies append.
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    fs::create_dir_all(&config.directory)?;

    let writer = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            tracing_appender::non_blocking(File::create(path)?)
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

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() -> Result<(), LogError> {
    ArborSubscriberBuilder::new().init().map(|_| ())
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Result<(), LogError> {
    ArborSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
        .map(|_| ())
}

/// Initialize logging for tests, ignoring an already installed subscriber
pub fn init_testing() {
    let _ = ArborSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = ArborSubscriberBuilder::new();
        assert_eq!(builder.config().level, "info");
        assert_eq!(builder.config().console.format, ConsoleFormat::Json);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = ArborSubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config().level, "debug");
        assert_eq!(builder.config().console.format, ConsoleFormat::Pretty);
    }

    #[test]
    fn test_builder_overrides() {
        let builder = ArborSubscriberBuilder::new()
            .with_level("warn")
            .with_directive("arbor_storage=trace")
            .with_console_format(ConsoleFormat::Off)
            .with_file_output(FileConfig::default());

        assert_eq!(builder.config().filter(), "warn,arbor_storage=trace");
        assert_eq!(builder.config().console.format, ConsoleFormat::Off);
        assert!(builder.config().file.is_some());
    }

    #[test]
    fn test_never_rotation_creates_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            directory: dir.path().join("nested"),
            prefix: "node".to_string(),
            rotation: RotationStrategy::Never,
        };

        let (_writer, _guard) = file_writer(&config).unwrap();
        assert!(dir.path().join("nested").join("node.log").exists());
    }
}
