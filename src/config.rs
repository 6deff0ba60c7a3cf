//! Configuration module.
//!
//! Handles loading and saving application settings from JSON file.

use crate::error::ConfigError;
use crate::gesture::GesturePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sound configuration for language change notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Whether sound is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory with `<Language>.mp3` clips. Relative paths are resolved
    /// against the executable's directory.
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    /// Fallback tone frequency (Hz).
    #[serde(default = "default_fallback_frequency")]
    pub fallback_frequency: u32,
    /// Fallback tone duration in milliseconds.
    #[serde(default = "default_fallback_duration")]
    pub fallback_duration_ms: u32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            audio_dir: default_audio_dir(),
            fallback_frequency: default_fallback_frequency(),
            fallback_duration_ms: default_fallback_duration(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Delay between the switch gesture and the layout check.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    /// Key sequence treated as a language switch.
    #[serde(default)]
    pub gesture: GesturePolicy,
    /// Sound configuration.
    #[serde(default)]
    pub sound: SoundConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            gesture: GesturePolicy::default(),
            sound: SoundConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn default_audio_dir() -> PathBuf {
    PathBuf::from("Audio")
}
fn default_fallback_frequency() -> u32 {
    800
}
fn default_fallback_duration() -> u32 {
    150
}
fn default_debounce() -> u64 {
    250
}

/// Configuration manager.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a manager for `config.json` next to the executable.
    pub fn new() -> Self {
        Self::with_path(base_dir().join("config.json"))
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Loads configuration from file.
    ///
    /// If the file doesn't exist, creates it with default values.
    pub fn load(&self) -> AppConfig {
        if !self.config_path.exists() {
            let config = AppConfig::default();
            if let Err(e) = self.save(&config) {
                log::warn!("Failed to write default config: {}", e);
            }
            return config;
        }

        match fs::read_to_string(&self.config_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Failed to parse config: {}, using defaults", e);
                AppConfig::default()
            }),
            Err(e) => {
                log::warn!("Failed to read config: {}, using defaults", e);
                AppConfig::default()
            }
        }
    }

    /// Saves configuration to file.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory of the executable, or the current directory as a fallback.
pub fn base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolves `path` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
