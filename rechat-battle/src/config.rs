//! Battle engine configuration
//!
//! Loaded from TOML with every field defaulted, so an empty or missing
//! file is always usable. Resolution order: explicit path, then the
//! `RECHAT_BATTLE_CONFIG` environment variable, then the platform config
//! directory, then built-in defaults. An explicit or env-var path that
//! cannot be read is an error; the platform file is optional.

use rechat_common::error::{Error, Result};
use rechat_common::time;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable naming the config file path
pub const CONFIG_ENV_VAR: &str = "RECHAT_BATTLE_CONFIG";

/// Tunable parameters of the battle engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Hours from commitment to reveal deadline
    pub reveal_window_hours: u64,
    /// Monitor polling cadence in milliseconds
    pub poll_interval_ms: u64,
    /// Event bus buffer depth
    pub event_capacity: usize,
    /// Recording length cap (the platform clips video at 2:20)
    pub max_recording_ms: u64,
    /// Hashtags every announcement carries, bare (no `#`)
    pub default_hashtags: Vec<String>,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            reveal_window_hours: 24,
            poll_interval_ms: 5000,
            event_capacity: 128,
            max_recording_ms: 140_000,
            default_hashtags: vec![String::from("RapBattle"), String::from("ReChat")],
        }
    }
}

impl BattleConfig {
    /// Resolve and load the configuration
    ///
    /// See the module docs for the source order. The chosen source is
    /// logged; whichever source wins, the result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            info!(path = %path.display(), "battle configuration loaded (explicit path)");
            config
        } else if let Some(path) = Self::env_path() {
            let config = Self::from_file(&path)?;
            info!(
                path = %path.display(),
                env = CONFIG_ENV_VAR,
                "battle configuration loaded (environment)"
            );
            config
        } else if let Some(path) = Self::default_config_path().filter(|p| p.exists()) {
            let config = Self::from_file(&path)?;
            info!(path = %path.display(), "battle configuration loaded (platform config dir)");
            config
        } else {
            info!("battle configuration using built-in defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.reveal_window_hours == 0 {
            return Err(Error::Config(String::from(
                "reveal_window_hours must be positive",
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(String::from(
                "poll_interval_ms must be positive",
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config(String::from(
                "event_capacity must be positive",
            )));
        }
        Ok(())
    }

    /// Monitor cadence as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        time::millis_to_duration(self.poll_interval_ms)
    }

    /// Platform location of the optional config file
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rechat").join("battle.toml"))
    }

    fn env_path() -> Option<PathBuf> {
        env::var(CONFIG_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }
}
