//! Daemon configuration
//!
//! The configuration file is TOML with one table per backend. A backend reads
//! only its own table and falls back to defaults when the table is absent.
//!
//! ```toml
//! [backlight]
//! backend = "sysfs"
//! device = "pwm-backlight"
//!
//! [gpio]
//! handset = 17
//! smartcard = 22
//!
//! [watchdog]
//! timeout = 30
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A backend table has keys of the wrong type or value
    #[error("invalid [{section}] settings: {source}")]
    InvalidSection {
        section: String,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }
}

/// Parsed configuration file, one table per backend
#[derive(Debug, Clone, Default)]
pub struct Config {
    table: toml::Table,
    path: Option<PathBuf>,
}

impl Config {
    /// Load and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let table = toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))?;

        tracing::debug!("Loaded configuration from {}", path.display());

        Ok(Self {
            table,
            path: Some(path.to_path_buf()),
        })
    }

    /// File the configuration was loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Deserialize the table `name`, or the defaults when it is absent
    pub fn section<T>(&self, name: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.table.get(name) {
            None => Ok(T::default()),
            Some(value) => value
                .clone()
                .try_into()
                .map_err(|source| ConfigError::InvalidSection {
                    section: name.to_string(),
                    source,
                }),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let table = toml::from_str(content).map_err(|e| ConfigError::parse_toml("<inline>", e))?;
        Ok(Self { table, path: None })
    }
}

/// `[events]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsSection {
    pub handset_queue_capacity: usize,
}

impl Default for EventsSection {
    fn default() -> Self {
        let defaults = event_manager::EventManagerConfig::default();
        Self {
            handset_queue_capacity: defaults.handset_queue_capacity,
        }
    }
}

impl From<EventsSection> for event_manager::EventManagerConfig {
    fn from(section: EventsSection) -> Self {
        Self {
            handset_queue_capacity: section.handset_queue_capacity,
        }
    }
}

/// `[tasks]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TasksSection {
    pub pid_ceiling: i32,
    pub forward_display: bool,
    pub inherit_env: bool,
}

impl Default for TasksSection {
    fn default() -> Self {
        let defaults = task_manager::TaskManagerConfig::default();
        Self {
            pid_ceiling: defaults.pid_ceiling,
            forward_display: defaults.forward_display,
            inherit_env: defaults.inherit_env,
        }
    }
}

impl From<TasksSection> for task_manager::TaskManagerConfig {
    fn from(section: TasksSection) -> Self {
        Self {
            pid_ceiling: section.pid_ceiling,
            forward_display: section.forward_display,
            inherit_env: section.inherit_env,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let config = Config::default();
        assert!(!config.has_section("sample"));
        assert_eq!(config.section::<Sample>("sample").unwrap(), Sample::default());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: Config = "[sample]\ncount = 3\n".parse().unwrap();
        let sample: Sample = config.section("sample").unwrap();
        assert_eq!(
            sample,
            Sample {
                name: String::new(),
                count: 3
            }
        );
    }

    #[test]
    fn test_wrong_type_names_the_section() {
        let config: Config = "[sample]\ncount = \"many\"\n".parse().unwrap();
        let err = config.section::<Sample>("sample").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSection { ref section, .. } if section == "sample"
        ));
        assert!(err.to_string().contains("[sample]"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tasks]\npid_ceiling = 100").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.path(), Some(file.path()));

        let tasks: TasksSection = config.section("tasks").unwrap();
        assert_eq!(tasks.pid_ceiling, 100);
        assert!(tasks.forward_display);
        assert!(!tasks.inherit_env);
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load("/nonexistent/remote-control.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::ReadFile { .. }));

        let invalid = "[broken".parse::<Config>().unwrap_err();
        assert!(matches!(invalid, ConfigError::ParseToml { .. }));
    }
}
