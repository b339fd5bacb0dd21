//! Credential Store
//!
//! Passwords keyed by (definition, data id, username) with a save-type
//! policy: `Never` keeps nothing, `UntilRestart` lives in-process, `Forever`
//! persists to a JSON file under the config dir. Callers treat this as a
//! black box; connection probing and prompting live in the app layer.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How long a saved password survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SaveType {
    Never,
    #[default]
    UntilRestart,
    Forever,
}

/// Lookup key for a stored password
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialKey {
    pub definition: String,
    pub data_id: String,
    pub username: String,
}

impl CredentialKey {
    pub fn new(definition: &str, data_id: &str, username: &str) -> Self {
        Self {
            definition: definition.to_string(),
            data_id: data_id.to_string(),
            username: username.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DurableEntry {
    #[serde(flatten)]
    key: CredentialKey,
    password: String,
    saved_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DurableFile {
    #[serde(default)]
    entries: Vec<DurableEntry>,
}

/// Password store with session and durable tiers
pub struct PasswordStore {
    path: Option<PathBuf>,
    session: HashMap<CredentialKey, String>,
    durable: HashMap<CredentialKey, DurableEntry>,
}

impl PasswordStore {
    /// Store backed by the default credentials file
    pub fn new() -> Self {
        let path = dirs::config_dir().map(|p| p.join("taz").join("credentials.json"));
        Self::with_optional_path(path)
    }

    /// Store backed by an explicit file, for tests
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self::with_optional_path(Some(path.into()))
    }

    fn with_optional_path(path: Option<PathBuf>) -> Self {
        let durable = path
            .as_deref()
            .map(Self::read_durable)
            .unwrap_or_default();
        Self {
            path,
            session: HashMap::new(),
            durable,
        }
    }

    fn read_durable(path: &Path) -> HashMap<CredentialKey, DurableEntry> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return HashMap::new();
        };
        let file: DurableFile = serde_json::from_str(&content).unwrap_or_default();
        file.entries
            .into_iter()
            .map(|e| (e.key.clone(), e))
            .collect()
    }

    fn write_durable(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = DurableFile {
            entries: self.durable.values().cloned().collect(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Save a password under the given policy. `Never` drops any existing
    /// copies instead of storing.
    #[allow(dead_code)]
    pub fn save_password(
        &mut self,
        key: &CredentialKey,
        password: &str,
        save_type: SaveType,
    ) -> Result<()> {
        match save_type {
            SaveType::Never => {
                self.session.remove(key);
                if self.durable.remove(key).is_some() {
                    self.write_durable()?;
                }
            }
            SaveType::UntilRestart => {
                self.session.insert(key.clone(), password.to_string());
            }
            SaveType::Forever => {
                self.durable.insert(
                    key.clone(),
                    DurableEntry {
                        key: key.clone(),
                        password: password.to_string(),
                        saved_at: Utc::now(),
                    },
                );
                self.write_durable()?;
            }
        }
        Ok(())
    }

    /// Load a password saved under the given policy
    pub fn load_password(&self, key: &CredentialKey, save_type: SaveType) -> Option<String> {
        match save_type {
            SaveType::Never => None,
            SaveType::UntilRestart => self.session.get(key).cloned(),
            SaveType::Forever => self.durable.get(key).map(|e| e.password.clone()),
        }
    }

    /// Re-key a durably saved password, e.g. when an entry moves between
    /// definitions. No-op when nothing is stored under `from`.
    pub fn migrate_password(&mut self, from: &CredentialKey, to: &CredentialKey) -> Result<bool> {
        if from == to {
            return Ok(false);
        }
        let Some(mut entry) = self.durable.remove(from) else {
            return Ok(false);
        };
        entry.key = to.clone();
        self.durable.insert(to.clone(), entry);
        self.write_durable()?;
        Ok(true)
    }
}

impl Default for PasswordStore {
    fn default() -> Self {
        Self::new()
    }
}
