//! Configuration Management
//!
//! Handles persistent configuration storage for taz: the selected
//! subscription, the ordered favorites list, and linked resource ids.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Last used subscription id
    #[serde(default)]
    pub subscription: Option<String>,
    /// Pinned resource ids, front of the list renders first.
    /// Flat ordered string list, no schema versioning.
    #[serde(default)]
    pub favorites: Vec<String>,
    /// Manually linked resource ids shown under the Linked Resources root
    #[serde(default)]
    pub linked_resources: Vec<String>,
}

impl Config {
    /// Get the config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("taz").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load from an explicit path; missing or corrupt files fall back to
    /// defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::default_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective subscription (CLI > config > environment)
    pub fn effective_subscription(&self) -> String {
        self.subscription
            .clone()
            .or_else(|| std::env::var("AZURE_SUBSCRIPTION_ID").ok())
            .unwrap_or_default()
    }

    /// Set subscription and save
    pub fn set_subscription(&mut self, subscription: &str) -> Result<()> {
        self.subscription = Some(subscription.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_favorite_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            subscription: Some("sub-1".to_string()),
            favorites: vec!["/id/b".to_string(), "/id/a".to_string()],
            linked_resources: vec!["/id/linked".to_string()],
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_and_corrupt_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("nope.json");
        assert_eq!(Config::load_from(&missing), Config::default());

        let corrupt = dir.path().join("bad.json");
        std::fs::write(&corrupt, "{not json").unwrap();
        assert_eq!(Config::load_from(&corrupt), Config::default());
    }
}
