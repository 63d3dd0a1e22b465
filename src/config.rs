//! Configuration system for the proxy executor
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (PROXY_EXECUTOR_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::executor::{ExecutorKind, DEFAULT_KIND};
use crate::util::collapse;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Driver and executor selection
    pub dispatch: DispatchSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Data storage paths
    pub storage: StorageSettings,
}

/// Driver and executor selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Driver name used in diagnostics (auto-generated if not set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,

    /// Executor kind name or alias
    pub executor: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Storage path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base directory for run reports
    pub data_dir: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            driver_name: None,
            executor: DEFAULT_KIND.name().to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.proxy-executor".to_string(),
        }
    }
}

impl DispatchSettings {
    /// Configured driver name, or a generated one
    pub fn driver_name(&self) -> String {
        self.driver_name.clone().unwrap_or_else(|| {
            format!("driver-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
        })
    }
}

impl DispatchConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::ConfigNotFound {
                path: path.clone(),
                source: Some(e),
            })?;
            config = Self::parse(&content)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse TOML content.
    ///
    /// List values in `[dispatch]` collapse to their last item, so a layered
    /// file may write `executor = ["threaded", "sync"]`.
    pub fn parse(content: &str) -> Result<Self> {
        let mut document: toml::Table = toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            source: Some(e),
        })?;

        if let Some(dispatch) = document.get("dispatch") {
            let collapsed = collapse(dispatch, &[], None)?;
            document.insert("dispatch".to_string(), toml::Value::Table(collapsed));
        }

        toml::Value::Table(document)
            .try_into()
            .map_err(|e: toml::de::Error| Error::ConfigParse {
                message: e.to_string(),
                source: Some(e),
            })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            Some(PathBuf::from("proxy-executor.toml")),
            // User config directory
            dirs::config_dir().map(|p| p.join("proxy-executor").join("config.toml")),
            // Home directory
            dirs::home_dir().map(|p| p.join(".proxy-executor").join("config.toml")),
        ];

        for path in search_paths.iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Dispatch settings
        if let Ok(val) = std::env::var("PROXY_EXECUTOR_DRIVER_NAME") {
            self.dispatch.driver_name = Some(val);
        }
        if let Ok(val) = std::env::var("PROXY_EXECUTOR_EXECUTOR") {
            self.dispatch.executor = val;
        }

        // Logging settings
        if let Ok(val) = std::env::var("PROXY_EXECUTOR_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("PROXY_EXECUTOR_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("PROXY_EXECUTOR_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }

        // Storage settings
        if let Ok(val) = std::env::var("PROXY_EXECUTOR_DATA_DIR") {
            self.storage.data_dir = val;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.data_dir = expand_path(&self.storage.data_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if ExecutorKind::from_name(&self.dispatch.executor).is_none() {
            return Err(Error::config_field_invalid(
                "dispatch.executor",
                format!(
                    "Unknown executor '{}'. Must be one of: {}",
                    self.dispatch.executor,
                    ExecutorKind::accepted_names().join(", ")
                ),
            ));
        }

        if let Some(ref name) = self.dispatch.driver_name {
            if name.trim().is_empty() {
                return Err(Error::config_field_invalid(
                    "dispatch.driver_name",
                    "Driver name cannot be empty",
                ));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        if self.storage.data_dir.is_empty() {
            return Err(Error::config_field_invalid(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        Ok(())
    }

    /// Get the data directory as a PathBuf
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".proxy-executor")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        crate::util::ensure_tree(parent)?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Proxy Executor Configuration

[dispatch]
# Driver name shown in diagnostics (auto-generated if not set)
# driver_name = "zookeeper"

# Executor kind: threaded, greenthreaded, synchronous
# (aliases: thread, threading, greenthread, greenthreading, sync)
executor = "threaded"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.proxy-executor/logs/proxy-executor.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

[storage]
# Base directory for run reports
data_dir = "~/.proxy-executor"
"#
    .to_string()
}
