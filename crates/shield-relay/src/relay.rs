//! The background message handler.
//!
//! Every monitor engine talks to one [`Relay`]. Requests arrive as JSON
//! objects tagged by `action`; replies are plain JSON objects. Settings
//! changes fan out to every engine through a broadcast channel.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use shield_core::messages::{
    to_reply, AckReply, EngineMessage, ErrorReply, RelayRequest, SettingsPatch, StatusReply,
};
use shield_core::{AnalysisResponse, RelayError, RelayTransport, VideoMetadata};
use shield_settings::{SettingsStore, StoredSettings};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::classifier::Classify;

const KNOWN_ACTIONS: [&str; 4] = ["analyzeVideo", "getStatus", "getSettings", "updateSettings"];

pub struct Relay {
    classifier: Arc<dyn Classify>,
    store: Arc<dyn SettingsStore>,
    settings: RwLock<StoredSettings>,
    toggles: broadcast::Sender<Value>,
}

impl Relay {
    /// Reads the persisted settings once; a store failure falls back to defaults.
    pub fn new(
        classifier: Arc<dyn Classify>,
        store: Arc<dyn SettingsStore>,
        broadcast_capacity: usize,
    ) -> Self {
        let settings = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load stored settings, using defaults");
            StoredSettings::default()
        });
        let (toggles, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            classifier,
            store,
            settings: RwLock::new(settings),
            toggles,
        }
    }

    /// A receiver for `toggleEnabled` broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.toggles.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.read().is_enabled
    }

    /// Dispatch one message and produce its reply.
    pub async fn handle(&self, message: Value) -> Value {
        let request = match serde_json::from_value::<RelayRequest>(message.clone()) {
            Ok(request) => request,
            Err(e) => return reject(&message, &e),
        };
        match request {
            RelayRequest::AnalyzeVideo { data } => to_reply(&self.analyze(data).await),
            RelayRequest::GetStatus | RelayRequest::GetSettings => to_reply(&StatusReply {
                is_enabled: self.is_enabled(),
            }),
            RelayRequest::UpdateSettings { settings } => self.update_settings(settings),
        }
    }

    async fn analyze(&self, data: VideoMetadata) -> AnalysisResponse {
        debug!(page = %data.url, source = ?data.src, "classifying");
        match self.classifier.classify(&data.url).await {
            Ok(verdict) => match serde_json::from_value(verdict) {
                Ok(actions) => AnalysisResponse::new(actions),
                Err(e) => {
                    warn!(error = %e, "classifier verdict has an unexpected shape, using safe default");
                    AnalysisResponse::safe_default()
                }
            },
            Err(e) => {
                warn!(error = %e, kind = e.error_kind(), "classification failed, using safe default");
                AnalysisResponse::safe_default()
            }
        }
    }

    /// The write guard spans merge, save and assign so concurrent updates
    /// leave memory and the store agreeing.
    fn update_settings(&self, patch: SettingsPatch) -> Value {
        let next = {
            let mut current = self.settings.write();
            let mut next = *current;
            if let Some(enabled) = patch.is_enabled {
                next.is_enabled = enabled;
            }
            if let Err(e) = self.store.save(&next) {
                warn!(error = %e, "failed to save settings");
                return to_reply(&ErrorReply::new(e.to_string()));
            }
            *current = next;
            next
        };
        info!(enabled = next.is_enabled, "settings updated");

        let toggle = to_reply(&EngineMessage::toggle(next.is_enabled));
        match self.toggles.send(toggle) {
            Ok(receivers) => debug!(receivers, "toggle broadcast"),
            Err(_) => debug!("no engines subscribed to toggle broadcast"),
        }
        to_reply(&AckReply::ok())
    }
}

fn reject(message: &Value, error: &serde_json::Error) -> Value {
    let action = message.get("action").and_then(Value::as_str);
    match action {
        Some(action) if KNOWN_ACTIONS.contains(&action) => {
            debug!(action, error = %error, "malformed relay request");
            json!({ "error": format!("Invalid {action} request: {error}") })
        }
        _ => {
            debug!(?action, "unknown relay action");
            to_reply(&ErrorReply::unknown_action())
        }
    }
}

#[async_trait]
impl RelayTransport for Relay {
    async fn send(&self, message: Value) -> Result<Value, RelayError> {
        Ok(self.handle(message).await)
    }
}
