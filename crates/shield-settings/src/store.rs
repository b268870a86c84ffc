//! The Settings Store: persistence for the single `isEnabled` flag.

use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::debug;

use crate::errors::Result;
use crate::loader::shield_dir;
use crate::types::StoredSettings;

/// Load/save for [`StoredSettings`].
pub trait SettingsStore: Send + Sync {
    /// Missing data yields [`StoredSettings::default()`].
    fn load(&self) -> Result<StoredSettings>;
    fn save(&self, settings: &StoredSettings) -> Result<()>;
}

/// JSON file store, `~/.babyshield/settings.json` by default.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Self {
        Self::new(shield_dir().join("settings.json"))
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<StoredSettings> {
        if !self.path.exists() {
            debug!(path = ?self.path, "settings file not found, using defaults");
            return Ok(StoredSettings::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, settings: &StoredSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        debug!(path = ?self.path, is_enabled = settings.is_enabled, "settings saved");
        Ok(())
    }
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemorySettingsStore {
    inner: Mutex<Option<StoredSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(settings: StoredSettings) -> Self {
        Self {
            inner: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<StoredSettings> {
        let stored = *self.inner.lock();
        Ok(stored.unwrap_or_default())
    }

    fn save(&self, settings: &StoredSettings) -> Result<()> {
        *self.inner.lock() = Some(*settings);
        Ok(())
    }
}
