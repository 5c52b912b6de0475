//! Configuration for the playback core
//!
//! Bootstrap settings are read once from TOML at startup. Every section and
//! every field has a compiled default, so an empty or missing file is valid.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--config, --api-url)
//! 2. Environment variables (KCONNECT_CONFIG, KCONNECT_API_URL)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use kconnect_common::config::{self as common_config, LoggingConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level player configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub presence: PresenceConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlayerConfig {
    /// Load from `path` (missing file → defaults)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: PlayerConfig = common_config::load_toml_or_default(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.playback.initial_volume) {
            return Err(Error::Config(format!(
                "playback.initial_volume must be within 0.0-1.0, got {}",
                self.playback.initial_volume
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Config("api.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Where the last-played session is persisted
    pub fn session_file(&self) -> PathBuf {
        self.storage
            .session_file
            .clone()
            .unwrap_or_else(|| common_config::default_data_dir().join("last_session.json"))
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST base URL, e.g. `https://k-connect.example/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional bearer token
    #[serde(default)]
    pub session_token: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Playback engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Overlap the end of a track with the start of the next
    #[serde(default = "default_true")]
    pub enable_crossfade: bool,

    /// Volume applied before any user change (0.0-1.0)
    #[serde(default = "default_volume")]
    pub initial_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            enable_crossfade: true,
            initial_volume: default_volume(),
        }
    }
}

fn default_volume() -> f32 {
    0.8
}

fn default_true() -> bool {
    true
}

/// Track catalog settings
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Schedule a follow-up page after every full page
    #[serde(default = "default_true")]
    pub background_prefetch: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            background_prefetch: true,
        }
    }
}

/// Presence reporting settings
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    /// Post play counts and now-playing status
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Media surface settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaConfig {
    /// Re-publish on every native play/pause event (lock-screens that desync)
    #[serde(default)]
    pub lockscreen_quirks: bool,
}

/// Local storage settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Last-session file; defaults under the platform data dir
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}
