//! Configuration loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ShieldSettings::default()`]
//! 2. If `~/.babyshield/config.json` exists, deep-merge user values over defaults
//! 3. Apply `BABYSHIELD_*` environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::ShieldSettings;

/// Accepted `monitor.scanIntervalMs` values.
pub const SCAN_INTERVAL_MS_RANGE: (u64, u64) = (100, 600_000);
/// Accepted `classifier.timeoutMs` values.
pub const CLASSIFIER_TIMEOUT_MS_RANGE: (u64, u64) = (1_000, 3_600_000);

/// `~/.babyshield`, or `/tmp/.babyshield` without a home directory.
pub fn shield_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".babyshield")
}

/// Resolve the path to the configuration file.
pub fn config_path() -> PathBuf {
    shield_dir().join("config.json")
}

/// Load configuration from the default path with env var overrides.
pub fn load_settings() -> Result<ShieldSettings> {
    load_settings_from_path(&config_path())
}

/// Load configuration from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or an out-of-range file value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ShieldSettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<ShieldSettings> {
    let defaults = serde_json::to_value(ShieldSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading config from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "config file not found, using defaults");
        defaults
    };

    let settings: ShieldSettings = serde_json::from_value(merged)?;
    validate(&settings)?;
    Ok(settings)
}

/// Reject values the monitor and classifier cannot run with.
pub fn validate(settings: &ShieldSettings) -> Result<()> {
    let (min, max) = SCAN_INTERVAL_MS_RANGE;
    let interval = settings.monitor.scan_interval_ms;
    if !(min..=max).contains(&interval) {
        return Err(SettingsError::InvalidValue(format!(
            "monitor.scanIntervalMs must be between {min} and {max}, got {interval}"
        )));
    }
    let factor = settings.monitor.default_speed_factor;
    if !factor.is_finite() || factor <= 0.0 {
        return Err(SettingsError::InvalidValue(format!(
            "monitor.defaultSpeedFactor must be a positive number, got {factor}"
        )));
    }
    let (min, max) = CLASSIFIER_TIMEOUT_MS_RANGE;
    let timeout = settings.classifier.timeout_ms;
    if !(min..=max).contains(&timeout) {
        return Err(SettingsError::InvalidValue(format!(
            "classifier.timeoutMs must be between {min} and {max}, got {timeout}"
        )));
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `BABYSHIELD_*` overrides read through `lookup`.
///
/// Invalid values are ignored with a warning and the file/default value stays.
pub fn apply_overrides(settings: &mut ShieldSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    if let Some(v) = env.string("BABYSHIELD_CLASSIFIER_URL") {
        settings.classifier.endpoint = v;
    }
    let (min, max) = CLASSIFIER_TIMEOUT_MS_RANGE;
    if let Some(v) = env.u64_in("BABYSHIELD_CLASSIFIER_TIMEOUT_MS", min, max) {
        settings.classifier.timeout_ms = v;
    }
    let (min, max) = SCAN_INTERVAL_MS_RANGE;
    if let Some(v) = env.u64_in("BABYSHIELD_SCAN_INTERVAL_MS", min, max) {
        settings.monitor.scan_interval_ms = v;
    }
    if let Some(v) = env.bool("BABYSHIELD_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64_in(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}
