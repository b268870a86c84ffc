//! Settings type definitions.
//!
//! Field names are camelCase on the wire. Every struct is `#[serde(default)]`
//! so a partial JSON file only overrides what it names.

use serde::{Deserialize, Serialize};

/// Root configuration for the monitor, the relay and the CLI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShieldSettings {
    pub classifier: ClassifierSettings,
    pub monitor: MonitorSettings,
    pub relay: RelaySettings,
    pub logging: LoggingSettings,
}

/// Remote classification service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierSettings {
    pub endpoint: String,
    /// The service downloads and inspects a clip before answering.
    pub timeout_ms: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/api/download-video/".to_string(),
            timeout_ms: 120_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    pub scan_interval_ms: u64,
    pub default_speed_factor: f64,
    pub default_warning_message: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            scan_interval_ms: 5_000,
            default_speed_factor: 0.5,
            default_warning_message: "This content may not be appropriate for children."
                .to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Capacity of the toggle broadcast channel.
    pub broadcast_capacity: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// What the Settings Store persists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredSettings {
    pub is_enabled: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self { is_enabled: true }
    }
}
