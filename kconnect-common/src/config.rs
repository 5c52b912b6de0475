//! Bootstrap configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/kconnect/config.toml`)
//!
//! A missing config file is never fatal: callers get compiled defaults and a
//! warning in the log.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "KCONNECT_CONFIG";

/// Application directory name under the platform config/data dirs
pub const APP_DIR_NAME: &str = "kconnect";

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolves which config file to read
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    env_var_name: String,
}

impl ConfigFileResolver {
    /// Resolver reading [`CONFIG_ENV_VAR`]
    pub fn new() -> Self {
        Self::with_env_var(CONFIG_ENV_VAR)
    }

    /// Resolver reading a custom environment variable (used by tests)
    pub fn with_env_var(env_var_name: impl Into<String>) -> Self {
        Self {
            env_var_name: env_var_name.into(),
        }
    }

    /// Pick the config file path, or `None` when nothing is configured and the
    /// platform default does not exist
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_file().filter(|p| p.exists())
    }
}

impl Default for ConfigFileResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// `<config_dir>/kconnect/config.toml` for the current platform
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// `<data_local_dir>/kconnect`, falling back to `./kconnect_data`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./kconnect_data"))
}

/// Parse a TOML document into `T`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Load `T` from a TOML file
///
/// Missing file → warning + `T::default()`. A file that exists but fails to
/// parse is an error: silently ignoring a broken config hides typos.
pub fn load_toml_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        info!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config = parse_toml(&content).map_err(|e| {
                Error::Config(format!("{}: {}", path.display(), e))
            })?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            Ok(T::default())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_logging_defaults() {
        let sample: Sample = parse_toml("").unwrap();
        assert_eq!(sample.logging.level, "info");
        assert!(sample.logging.file.is_none());
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let result: Result<Sample> = parse_toml("[logging\nlevel = 3");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_data_dir_is_named_for_app() {
        let dir = default_data_dir();
        assert!(dir.to_string_lossy().contains("kconnect"));
    }
}
