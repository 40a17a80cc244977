//! Configuration management for kbrowse.
//!
//! Handles:
//! - Server location and connection settings
//! - Default search parameters
//! - Display preferences

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KbrowseError, Result};
use crate::model::DEFAULT_PRINT_OFFSET;
use crate::util::atomic_write;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// KBrowse server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Defaults applied to every search.
    #[serde(default)]
    pub search: SearchDefaults,
    /// Display options.
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Project-specific configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = ".kbrowse.toml";

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        let config_path = default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration with project-specific overrides.
    ///
    /// Looks for `.kbrowse.toml` in `project_dir` and layers it over the
    /// global configuration.
    pub fn load_for_project(project_dir: &Path) -> Result<Self> {
        let mut config = Self::load().unwrap_or_default();

        let project_config_path = project_dir.join(PROJECT_CONFIG_FILENAME);
        if project_config_path.exists() {
            let project_config = Self::load_from(&project_config_path)?;
            config.merge_from(&project_config);
        }

        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(KbrowseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            KbrowseError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| KbrowseError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge_from(&mut self, other: &Config) {
        let defaults = Config::default();

        if other.server.base_url != defaults.server.base_url {
            self.server.base_url = other.server.base_url.clone();
        }
        if other.server.connect_timeout_seconds != defaults.server.connect_timeout_seconds {
            self.server.connect_timeout_seconds = other.server.connect_timeout_seconds;
        }

        if other.search.print_offset != defaults.search.print_offset {
            self.search.print_offset = other.search.print_offset;
        }
        if other.search.bootstrap_servers.is_some() {
            self.search.bootstrap_servers = other.search.bootstrap_servers.clone();
        }
        if other.search.topic.is_some() {
            self.search.topic = other.search.topic.clone();
        }
        if other.search.value_deserializer.is_some() {
            self.search.value_deserializer = other.search.value_deserializer.clone();
        }
        if other.search.schema_registry_url.is_some() {
            self.search.schema_registry_url = other.search.schema_registry_url.clone();
        }

        self.display = other.display.clone();
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| KbrowseError::InvalidConfig {
            message: format!("Failed to serialize config: {e}"),
        })?;

        atomic_write(path, content.as_bytes())
    }
}

/// Server location and connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the KBrowse server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Seconds to wait for the connection to open.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl ServerConfig {
    /// Connection timeout as a duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

/// Defaults applied when a search leaves a field unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDefaults {
    /// Progress granularity sent as `print-offset`.
    #[serde(default = "default_print_offset")]
    pub print_offset: u64,
    /// Cluster to search when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_servers: Option<String>,
    /// Topic to search when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Value deserializer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_deserializer: Option<String>,
    /// Schema registry for deserializers that need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_registry_url: Option<String>,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            print_offset: default_print_offset(),
            bootstrap_servers: None,
            topic: None,
            value_deserializer: None,
            schema_registry_url: None,
        }
    }
}

/// Display configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Indent each result.
    #[serde(default = "default_true")]
    pub pretty_json: bool,
    /// Use color output.
    #[serde(default = "default_true")]
    pub color: bool,
    /// Show the loading spinner and scan position.
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            pretty_json: true,
            color: true,
            progress: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_print_offset() -> u64 {
    DEFAULT_PRINT_OFFSET
}

/// Get the default configuration path.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| KbrowseError::unsupported("config directory discovery"))?;

    Ok(config_dir.join("kbrowse").join("config.toml"))
}
