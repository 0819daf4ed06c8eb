//! Configuration loading for the muster CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use muster_sources::GatewayConfig;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path of the inventory file.
    #[serde(default = "default_inventory_path")]
    pub inventory: PathBuf,

    /// Sources consulted by `muster update`, in order.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// Cloud gateway settings. Required when the `cloud` source is enabled.
    #[serde(default)]
    pub cloud: Option<GatewayConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

fn default_inventory_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "muster", "muster") {
        dirs.data_dir().join("inventory.json")
    } else {
        PathBuf::from("inventory.json")
    }
}

fn default_sources() -> Vec<String> {
    vec!["cloud".to_string(), "curated".to_string()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            inventory: default_inventory_path(),
            sources: default_sources(),
            cloud: None,
            logging: LoggingSection::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads configuration, falling back to defaults when the file does not
    /// exist. A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Logging section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level name (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log in JSON format.
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl LoggingSection {
    /// The tracing level this section names. Unknown names fall back to
    /// `info`.
    pub fn level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }
}
