use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use shield_core::{ElementId, VideoElement, VideoId};

/// Dedup key for the registry.
///
/// Elements without a source never share a key with each other: each keys on
/// its own host identity, so re-scanning the same element stays a no-op.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum SourceKey {
    Resolved(String),
    Unknown(ElementId),
}

impl SourceKey {
    pub fn for_element(element: &dyn VideoElement) -> Self {
        match element.resolved_source() {
            Some(src) => Self::Resolved(src),
            None => Self::Unknown(element.element_id()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved(src) => f.write_str(src),
            Self::Unknown(id) => write!(f, "<unknown #{}>", id.0),
        }
    }
}

#[derive(Debug, Default)]
struct RecordState {
    is_analyzed: bool,
    applied_filters: Vec<String>,
    /// Bumped on every load start.
    generation: u64,
}

/// One distinct video source seen on the page.
///
/// The record never owns its element; every mutation goes through
/// [`VideoRecord::live_element`], which fails once the page drops or detaches it.
pub struct VideoRecord {
    id: VideoId,
    source_key: SourceKey,
    element: Weak<dyn VideoElement>,
    original_playback_rate: f64,
    page_url: String,
    state: Mutex<RecordState>,
}

impl VideoRecord {
    pub fn new(element: &Arc<dyn VideoElement>, source_key: SourceKey, page_url: String) -> Self {
        Self {
            id: VideoId::new(),
            source_key,
            element: Arc::downgrade(element),
            original_playback_rate: element.playback_rate(),
            page_url,
            state: Mutex::new(RecordState::default()),
        }
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    pub fn source_key(&self) -> &SourceKey {
        &self.source_key
    }

    pub fn original_playback_rate(&self) -> f64 {
        self.original_playback_rate
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// The element, if it still exists and is attached to its document.
    pub fn live_element(&self) -> Option<Arc<dyn VideoElement>> {
        self.element.upgrade().filter(|el| el.is_connected())
    }

    pub fn is_analyzed(&self) -> bool {
        self.state.lock().is_analyzed
    }

    pub fn applied_filters(&self) -> Vec<String> {
        self.state.lock().applied_filters.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// The element began loading a new source: forget the verdict and filters.
    pub fn reset_for_new_source(&self) {
        let mut state = self.state.lock();
        state.is_analyzed = false;
        state.applied_filters.clear();
        state.generation += 1;
    }

    /// Mark analyzed if no load start happened since `generation` was read.
    pub fn mark_analyzed(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        state.is_analyzed = true;
        true
    }

    pub fn set_applied_filters(&self, filters: Vec<String>) {
        self.state.lock().applied_filters = filters;
    }
}

impl std::fmt::Debug for VideoRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("VideoRecord")
            .field("id", &self.id)
            .field("source_key", &self.source_key)
            .field("page_url", &self.page_url)
            .field("is_analyzed", &state.is_analyzed)
            .field("applied_filters", &state.applied_filters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeVideo;

    fn record_for(video: &Arc<FakeVideo>) -> VideoRecord {
        let element: Arc<dyn VideoElement> = video.clone();
        VideoRecord::new(
            &element,
            SourceKey::for_element(element.as_ref()),
            "https://example.com".into(),
        )
    }

    #[test]
    fn captures_original_rate_and_key() {
        let video = FakeVideo::with_src("https://cdn.example/a.mp4");
        video.set_playback_rate_raw(1.5);
        let record = record_for(&video);
        assert_eq!(record.original_playback_rate(), 1.5);
        assert_eq!(
            record.source_key(),
            &SourceKey::Resolved("https://cdn.example/a.mp4".into())
        );
        assert!(!record.is_analyzed());
        assert!(record.applied_filters().is_empty());
        assert!(record.id().as_str().starts_with("vid_"));
    }

    #[test]
    fn source_less_element_keys_on_identity() {
        let video = FakeVideo::without_src();
        let key = SourceKey::for_element(video.as_ref());
        assert!(key.is_unknown());
        assert_eq!(key, SourceKey::Unknown(video.element_id()));
    }

    #[test]
    fn reset_clears_verdict_and_filters() {
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);
        assert!(record.mark_analyzed(record.generation()));
        record.set_applied_filters(vec!["blur".into()]);

        record.reset_for_new_source();
        assert!(!record.is_analyzed());
        assert!(record.applied_filters().is_empty());
    }

    #[test]
    fn stale_generation_is_not_marked() {
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);
        let generation = record.generation();
        record.reset_for_new_source();
        assert!(!record.mark_analyzed(generation));
        assert!(!record.is_analyzed());
    }

    #[test]
    fn live_element_tracks_lifetime() {
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);
        assert!(record.live_element().is_some());

        video.detach();
        assert!(record.live_element().is_none());

        let other = FakeVideo::with_src("b.mp4");
        let record = record_for(&other);
        drop(other);
        assert!(record.live_element().is_none());
    }
}
