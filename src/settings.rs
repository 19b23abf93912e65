use crate::playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("no configuration directory available")]
    NoConfigDir,

    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Samples per second of loaded recordings
    pub sample_rate: u32,
    /// Samples per playback window
    pub window_size: usize,
    /// Simulated seconds per tick
    pub sim_delay: f64,
    /// Wall-clock seconds per tick
    pub rt_delay: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            sample_rate: 128,
            window_size: 128,
            sim_delay: 0.1,
            rt_delay: 0.1,
        }
    }
}

impl PlaybackSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("veegs").join("settings.json"))
    }

    /// Load from the user config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&contents)?;
        settings.validate()?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save to the user config directory
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        positive("sample_rate", self.sample_rate as f64)?;
        positive("window_size", self.window_size as f64)?;
        positive("sim_delay", self.sim_delay)?;
        positive("rt_delay", self.rt_delay)?;
        Ok(())
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            sim_delay: self.sim_delay,
            rt_delay: self.rt_delay,
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::NotPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = PlaybackSettings {
            sample_rate: 256,
            window_size: 512,
            sim_delay: 0.25,
            rt_delay: 0.05,
        };
        settings.save_to(&path).unwrap();

        assert_eq!(PlaybackSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "sim_delay": 0.5 }"#).unwrap();

        let settings = PlaybackSettings::load_from(&path).unwrap();
        assert_eq!(settings.sim_delay, 0.5);
        assert_eq!(settings.sample_rate, 128);
        assert_eq!(settings.rt_delay, 0.1);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "rt_delay": -0.1 }"#).unwrap();
        assert!(matches!(
            PlaybackSettings::load_from(&path),
            Err(SettingsError::NotPositive { name: "rt_delay", .. })
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(PlaybackSettings::load_from(&path), Err(SettingsError::Json(_))));

        let zero_rate = PlaybackSettings { sample_rate: 0, ..Default::default() };
        assert!(zero_rate.save_to(&path).is_err());
    }

    #[test]
    fn test_playback_config() {
        let config = PlaybackSettings::default().playback_config();
        assert_eq!(config, PlaybackConfig::default());
    }
}
