//! Logging configuration
//!
//! Everything here deserializes from TOML with every field optional, so a
//! deployment file only names what it changes:
//!
//! ```toml
//! level = "info"
//! directives = ["arbor_routing=trace"]
//!
//! [console]
//! format = "pretty"
//!
//! [file]
//! directory = "/var/log/arbor"
//! rotation = "hourly"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Crates whose output the presets refer to by name
pub const ARBOR_CRATES: [&str; 5] = [
    "arbor_routing",
    "arbor_crypto",
    "arbor_storage",
    "arbor_node",
    "arbor_simulation",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for anything no directive names; `RUST_LOG` replaces the lot
    pub level: String,

    /// Extra `target=level` filter directives
    pub directives: Vec<String>,

    pub console: ConsoleConfig,

    /// JSONL file output, off unless set
    pub file: Option<FileConfig>,

    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Pretty colored console at debug, with every routing decision traced
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            directives: vec!["arbor_routing=trace".to_string()],
            console: ConsoleConfig {
                format: ConsoleFormat::Pretty,
                ansi: true,
            },
            ..Default::default()
        }
    }

    /// Daily JSONL files under `log_dir` and nothing on the console
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            console: ConsoleConfig {
                format: ConsoleFormat::Off,
                ansi: false,
            },
            file: Some(FileConfig {
                directory: log_dir,
                ..FileConfig::default()
            }),
            ..Default::default()
        }
    }

    /// Warnings from the arbor crates only
    pub fn testing() -> Self {
        Self {
            level: "off".to_string(),
            directives: ARBOR_CRATES
                .iter()
                .map(|krate| format!("{}=warn", krate))
                .collect(),
            ..Default::default()
        }
    }

    /// Add a `target=level` directive
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// The filter string handed to `EnvFilter`
    pub fn filter(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// What the console layer prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// One JSON object per line
    #[default]
    Json,
    Pretty,
    Off,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub format: ConsoleFormat,
    /// Colors; only the pretty format uses them
    pub ansi: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; rolling files get a date suffix
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "arbor".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// A single file, truncated on start
    Never,
}

/// Shape of each JSON line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Event fields at the top level instead of under `fields`
    pub flatten: bool,
    /// Every enclosing span, not just the innermost
    pub span_list: bool,
    pub source_location: bool,
    pub thread_ids: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten: true,
            span_list: true,
            source_location: false,
            thread_ids: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_json_console_at_info() {
        let config = LogConfig::default();
        assert_eq!(config.filter(), "info");
        assert_eq!(config.console.format, ConsoleFormat::Json);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_development_traces_routing() {
        let config = LogConfig::development();
        assert_eq!(config.console.format, ConsoleFormat::Pretty);
        assert_eq!(config.filter(), "debug,arbor_routing=trace");
    }

    #[test]
    fn test_production_writes_files_only() {
        let config = LogConfig::production(PathBuf::from("/var/log/arbor"));
        assert_eq!(config.console.format, ConsoleFormat::Off);
        let file = config.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/var/log/arbor"));
        assert_eq!(file.rotation, RotationStrategy::Daily);
    }

    #[test]
    fn test_testing_names_every_crate() {
        let filter = LogConfig::testing().filter();
        assert!(filter.starts_with("off,"));
        for krate in ARBOR_CRATES {
            assert!(filter.contains(&format!("{}=warn", krate)));
        }
    }

    #[test]
    fn test_empty_level_is_skipped() {
        let mut config = LogConfig::default().with_directive("arbor_node=trace");
        config.level.clear();
        assert_eq!(config.filter(), "arbor_node=trace");
    }

    #[test]
    fn test_partial_toml() {
        let config: LogConfig = toml::from_str(
            r#"
            directives = ["arbor_crypto=trace"]

            [console]
            format = "off"

            [file]
            directory = "/tmp/arbor"
            rotation = "hourly"
            "#,
        )
        .unwrap();

        assert_eq!(config.filter(), "info,arbor_crypto=trace");
        assert_eq!(config.console.format, ConsoleFormat::Off);
        let file = config.file.unwrap();
        assert_eq!(file.prefix, "arbor");
        assert_eq!(file.rotation, RotationStrategy::Hourly);
        assert!(config.jsonl.flatten);
    }
}
