//! Configuration management for zapcast
//!
//! Handles config file loading/saving and the server address lookup.
//! Config is stored at ~/.config/zapcast/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ContentType;
use crate::retry::RetryPolicy;

/// Server used when neither the environment nor the config names one
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Environment variable overriding the server base URL
pub const SERVER_ENV: &str = "ZAPCAST_SERVER";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog / stream server base URL
    pub server: Option<String>,
    /// Content shown at startup
    pub content_type: ContentType,
    /// Quiet period before a channel zap is committed (ms)
    pub zap_quiet_ms: u64,
    /// Delay before a failed player is remounted (s)
    pub retry_delay_secs: u64,
    /// Automatic retries for a stream that is not found
    pub max_bounded_retries: u32,
    /// Minimum interval between resume checkpoints (s)
    pub checkpoint_secs: u64,
    /// Player controls hide after this long without input (s)
    pub controls_hide_secs: u64,
    /// Live channel list refresh for now-playing titles (s)
    pub now_playing_refresh_secs: u64,
    /// Width of one poster cell in the grid (columns)
    pub cell_width: u16,
    /// mpv executable (name on PATH or absolute path)
    pub player: String,
    /// Default cast receiver
    pub cast_device: Option<String>,
    /// Progress store location (defaults to the data dir)
    pub progress_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            content_type: ContentType::Movie,
            zap_quiet_ms: 2000,
            retry_delay_secs: 5,
            max_bounded_retries: 2,
            checkpoint_secs: 5,
            controls_hide_secs: 4,
            now_playing_refresh_secs: 60,
            cell_width: 24,
            player: "mpv".to_string(),
            cast_device: None,
            progress_path: None,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/zapcast/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("zapcast").join("config.toml"))
    }

    /// Load config from the default location, or defaults if missing
    pub fn load() -> Self {
        Self::path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Load config from `path`; a missing or malformed file yields defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                Self::default()
            }
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Server base URL with fallback chain:
    /// 1. Environment variable ZAPCAST_SERVER
    /// 2. `server` from the config file
    /// 3. Local default
    pub fn server_url(&self) -> String {
        std::env::var(SERVER_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn zap_quiet_period(&self) -> Duration {
        Duration::from_millis(self.zap_quiet_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_bounded_retries,
            Duration::from_secs(self.retry_delay_secs),
        )
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_secs)
    }

    pub fn controls_hide_delay(&self) -> Duration {
        Duration::from_secs(self.controls_hide_secs)
    }

    pub fn now_playing_refresh(&self) -> Duration {
        Duration::from_secs(self.now_playing_refresh_secs.max(1))
    }
}
