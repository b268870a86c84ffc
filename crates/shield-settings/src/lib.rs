//! # shield-settings
//!
//! Configuration for the BabyShield monitor, relay and CLI.
//!
//! Configuration is loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ShieldSettings::default()`]
//! 2. **User file**: `~/.babyshield/config.json` (deep-merged over defaults)
//! 3. **Environment variables**: `BABYSHIELD_*` overrides (highest priority)
//!
//! The user-facing `isEnabled` toggle is not configuration: it lives in a
//! [`SettingsStore`] and is changed at runtime through the relay.

pub mod errors;
pub mod loader;
pub mod store;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    config_path, deep_merge, load_settings, load_settings_from_path, shield_dir, validate,
    CLASSIFIER_TIMEOUT_MS_RANGE, SCAN_INTERVAL_MS_RANGE,
};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use types::*;
