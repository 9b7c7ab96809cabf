use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::config::CaptureConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserSettings {
    capture: CaptureConfig,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
        }
    }
}

/// Persisted host-level settings (capture tuning), stored as pretty JSON
/// next to the attendance database. A corrupt or missing file falls back
/// to defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn capture(&self) -> CaptureConfig {
        self.data.read().unwrap().capture.clone()
    }

    pub fn update_capture(&self, config: CaptureConfig) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.capture = config;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        let mut config = store.capture();
        config.countdown_ticks = 5;
        store.update_capture(config).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.capture().countdown_ticks, 5);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.capture().countdown_ticks, 3);
    }
}
