//! Configuration management for the CLI.
//!
//! The CLI reads one TOML file holding the engine sections (`[classifier]`,
//! `[graph]`, `[correlator]`, `[query]`, `[ingest]`) next to its own
//! `[settings]` and an optional `database` path.

use crate::error::{CliError, Result};
use amanda_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database used when `--db` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Pipeline configuration
    #[serde(flatten)]
    pub engine: EngineConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".amanda").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Database path, preferring an explicit override.
    pub fn database(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        explicit.map(Path::to_path_buf).or_else(|| self.database.clone())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_query::ResolutionMode;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
        assert!(config.database.is_none());
        assert_eq!(config.engine.correlator.lateness_ms, 5000);
    }

    #[test]
    fn test_engine_sections_at_top_level() {
        let config = Config::from_toml(
            r#"
            database = "facts.db"

            [settings]
            color = false
            format = "json"

            [correlator]
            lateness_ms = 250

            [query]
            default_resolution = "strict"
            "#,
        )
        .unwrap();

        assert_eq!(config.database, Some(PathBuf::from("facts.db")));
        assert!(!config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert_eq!(config.engine.correlator.lateness_ms, 250);
        assert_eq!(config.engine.query.default_resolution, ResolutionMode::Strict);
    }

    #[test]
    fn test_invalid_engine_section_rejected() {
        let result = Config::from_toml(
            r#"
            [correlator]
            lateness_ms = 10000
            dedup_horizon_ms = 10
            "#,
        );
        assert!(matches!(result, Err(CliError::Engine(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[settings]\nformat = \"quiet\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.settings.format, OutputFormat::Quiet);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(CliError::Io(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.database = Some(PathBuf::from("amanda.db"));
        config.engine.correlator.lateness_ms = 42;
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.database, Some(PathBuf::from("amanda.db")));
        assert_eq!(reloaded.engine.correlator.lateness_ms, 42);
    }

    #[test]
    fn test_database_override() {
        let mut config = Config::default();
        assert_eq!(config.database(None), None);

        config.database = Some(PathBuf::from("a.db"));
        assert_eq!(config.database(None), Some(PathBuf::from("a.db")));
        assert_eq!(config.database(Some(Path::new("b.db"))), Some(PathBuf::from("b.db")));
    }
}
