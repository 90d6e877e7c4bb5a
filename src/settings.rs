use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::models::{CameraQuality, CameraSettings, ScannerConfig};

/// Toggles shown on the settings screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub depth_estimation: bool,
    pub auto_save: bool,
    pub high_quality: bool,
    pub haptic_feedback: bool,
    pub cloud_sync: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            depth_estimation: true,
            auto_save: true,
            high_quality: false,
            haptic_feedback: true,
            cloud_sync: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub scanner: ScannerConfig,
    pub camera: CameraSettings,
    pub preferences: Preferences,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    /// Loads `path` if present. Unparseable contents fall back to defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings {}: {err}", path.display());
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, AppSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> AppSettings {
        self.read().clone()
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        self.read().scanner.clone()
    }

    pub fn camera(&self) -> CameraSettings {
        self.read().camera.clone()
    }

    pub fn preferences(&self) -> Preferences {
        self.read().preferences.clone()
    }

    pub fn update_scanner_config(&self, config: ScannerConfig) -> Result<()> {
        config.validate()?;
        self.update(|settings| settings.scanner = config)
    }

    pub fn update_camera(&self, camera: CameraSettings) -> Result<()> {
        self.update(|settings| settings.camera = camera)
    }

    pub fn set_camera_quality(&self, quality: CameraQuality) -> Result<()> {
        self.update(|settings| settings.camera.quality = quality)
    }

    pub fn update_preferences(&self, preferences: Preferences) -> Result<()> {
        self.update(|settings| {
            settings.scanner.depth_estimation = preferences.depth_estimation;
            settings.preferences = preferences;
        })
    }

    /// Applies `change` and persists; memory is left untouched if the write fails.
    pub fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut AppSettings),
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: AppSettings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
