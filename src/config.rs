//! Per-user settings for the kmerlr CLI
//!
//! Stored in ~/.kmerlr/config.toml. Every field is optional; a missing file
//! or a missing field falls back to the built-in default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Threads for every pool when no per-pool count is set (0 = all CPUs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Threads for cross-validation folds and ensemble members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads_cv: Option<usize>,

    /// Threads for Gram matrix accumulation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads_saga: Option<usize>,

    /// Seed for fold assignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Settings {
    /// Get the settings directory path (~/.kmerlr/)
    pub fn dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".kmerlr"))
    }

    /// Get the settings file path (~/.kmerlr/config.toml)
    pub fn path() -> Result<PathBuf> {
        Ok(Self::dir()?.join("config.toml"))
    }

    /// Load settings, falling back to defaults when there is no file
    /// or no home directory.
    pub fn load() -> Result<Self> {
        match Self::path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn threads_cv(&self) -> Option<usize> {
        self.threads_cv.or(self.threads)
    }

    pub fn threads_saga(&self) -> Option<usize> {
        self.threads_saga.or(self.threads)
    }

    pub fn threads_lr(&self) -> Option<usize> {
        self.threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(settings.threads.is_none());
        assert!(settings.seed.is_none());
        assert_eq!(settings.threads_cv(), None);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_round_trip_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let settings = Settings {
            threads: Some(4),
            threads_cv: Some(2),
            seed: Some(7),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.threads_cv(), Some(2));
        assert_eq!(loaded.threads_saga(), Some(4));
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "threads = \"many\"\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
