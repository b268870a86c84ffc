//! Logging setup. Libraries only emit `tracing` events; binaries call
//! [`init_telemetry`] once at startup.

use std::str::FromStr;

use shield_settings::LoggingSettings;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "shield_monitor" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// JSON lines instead of human-readable output.
    pub json: bool,
    /// Write to stderr, keeping stdout free for protocol output.
    pub stderr: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
            stderr: true,
        }
    }
}

impl TelemetryConfig {
    /// Build from the `logging` config section; an unknown level falls back to INFO.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            log_level: Level::from_str(&settings.level).unwrap_or(Level::INFO),
            json: settings.json,
            ..Self::default()
        }
    }

    /// The `EnvFilter` directive used when RUST_LOG is unset.
    pub fn filter_directive(&self) -> String {
        let mut filter = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let fmt_layer = if config.json {
        let layer = tracing_subscriber::fmt::layer().json().with_target(true);
        if config.stderr {
            layer.with_writer(std::io::stderr).boxed()
        } else {
            layer.boxed()
        }
    } else {
        let layer = tracing_subscriber::fmt::layer().with_target(true);
        if config.stderr {
            layer.with_writer(std::io::stderr).boxed()
        } else {
            layer.boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}
