use serde::{Deserialize, Serialize};

/// Snapshot of a video element taken when analysis is requested.
///
/// Non-finite numbers (a duration before metadata has loaded, for example)
/// serialize as `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoMetadata {
    pub src: Option<String>,
    pub duration: Option<f64>,
    pub video_width: u32,
    pub video_height: u32,
    pub current_time: f64,
    pub volume: f64,
    pub playback_rate: f64,
    /// URL of the hosting page.
    pub url: String,
    pub title: String,
}
