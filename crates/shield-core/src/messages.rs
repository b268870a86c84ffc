//! JSON message shapes exchanged between monitor engines and the relay.
//!
//! Every message is an object tagged by its `action` field. Replies are
//! untagged objects; a failed request is answered with [`ErrorReply`].

use serde::{Deserialize, Serialize};

use crate::metadata::VideoMetadata;

/// Requests the relay understands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayRequest {
    AnalyzeVideo { data: VideoMetadata },
    GetStatus,
    GetSettings,
    UpdateSettings { settings: SettingsPatch },
}

/// Partial settings update; absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

/// Messages a monitor engine accepts: diagnostics queries and the toggle
/// broadcast pushed by the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EngineMessage {
    GetVideoCount,
    ToggleEnabled {
        #[serde(rename = "isEnabled")]
        is_enabled: bool,
    },
}

impl EngineMessage {
    pub fn toggle(is_enabled: bool) -> Self {
        Self::ToggleEnabled { is_enabled }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    pub is_enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountReply {
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AckReply {
    pub success: bool,
}

impl AckReply {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

impl ErrorReply {
    pub const UNKNOWN_ACTION: &'static str = "Unknown action";

    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn unknown_action() -> Self {
        Self::new(Self::UNKNOWN_ACTION)
    }

    /// Recognize an error reply in an arbitrary JSON value.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        value
            .get("error")
            .and_then(|e| e.as_str())
            .map(Self::new)
    }
}

/// Serialize a reply for the wire. Plain data types cannot fail to
/// serialize; the fallback keeps the reply well-formed regardless.
pub fn to_reply<T: Serialize>(reply: &T) -> serde_json::Value {
    serde_json::to_value(reply)
        .unwrap_or_else(|e| serde_json::json!({ "error": format!("serialize reply: {e}") }))
}
