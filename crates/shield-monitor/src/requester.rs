use std::sync::Arc;

use shield_core::{PageDocument, RelayError, VideoElement, VideoMetadata};
use tracing::{debug, info, warn};

use crate::actuator::{AppliedMitigations, SafetyActuator};
use crate::client::RelayClient;
use crate::record::VideoRecord;

/// How one analysis attempt ended.
#[derive(Debug)]
pub enum AnalysisOutcome {
    AlreadyAnalyzed,
    ElementGone,
    Applied(AppliedMitigations),
    /// The element started loading another source while the request was out.
    Stale,
    Failed(RelayError),
}

/// Sends one analysis request per source and hands the verdict to the actuator.
///
/// There is no in-flight guard: two play events that both arrive before the
/// first reply each send a request.
pub struct AnalysisRequester {
    client: RelayClient,
    actuator: SafetyActuator,
    page: Arc<dyn PageDocument>,
}

impl AnalysisRequester {
    pub fn new(client: RelayClient, actuator: SafetyActuator, page: Arc<dyn PageDocument>) -> Self {
        Self {
            client,
            actuator,
            page,
        }
    }

    pub async fn analyze(&self, record: &VideoRecord) -> AnalysisOutcome {
        if record.is_analyzed() {
            return AnalysisOutcome::AlreadyAnalyzed;
        }
        let Some(element) = record.live_element() else {
            debug!(video_id = %record.id(), "element gone before analysis");
            return AnalysisOutcome::ElementGone;
        };

        let generation = record.generation();
        let metadata = self.extract_metadata(element.as_ref());
        drop(element);
        debug!(video_id = %record.id(), source = ?metadata.src, "requesting analysis");

        match self.client.analyze(metadata).await {
            Ok(response) => {
                if !record.mark_analyzed(generation) {
                    info!(video_id = %record.id(), "source changed during analysis, dropping verdict");
                    return AnalysisOutcome::Stale;
                }
                let applied = self
                    .actuator
                    .apply(record, response.actions.as_ref())
                    .await;
                AnalysisOutcome::Applied(applied)
            }
            Err(e) => {
                warn!(
                    video_id = %record.id(),
                    error = %e,
                    kind = e.error_kind(),
                    "analysis request failed, will retry on next play"
                );
                AnalysisOutcome::Failed(e)
            }
        }
    }

    pub fn extract_metadata(&self, element: &dyn VideoElement) -> VideoMetadata {
        let duration = element.duration();
        VideoMetadata {
            src: element.resolved_source(),
            duration: duration.is_finite().then_some(duration),
            video_width: element.video_width(),
            video_height: element.video_height(),
            current_time: element.current_time(),
            volume: element.volume(),
            playback_rate: element.playback_rate(),
            url: self.page.url(),
            title: self.page.title(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ActuatorConfig;
    use crate::record::SourceKey;
    use crate::testing::{FakePage, FakeVideo, MockRelay, MockReply, ScriptedPrompt};
    use serde_json::json;
    use shield_core::PromptOutcome;
    use std::time::Duration;

    struct Harness {
        relay: Arc<MockRelay>,
        requester: AnalysisRequester,
    }

    fn harness(replies: Vec<MockReply>) -> Harness {
        let relay = Arc::new(MockRelay::new(replies));
        let page = FakePage::new("https://example.com/watch?v=1", "Nursery rhymes");
        let actuator = SafetyActuator::new(
            ActuatorConfig::default(),
            ScriptedPrompt::always(PromptOutcome::Continue),
        );
        Harness {
            requester: AnalysisRequester::new(RelayClient::new(relay.clone()), actuator, page),
            relay,
        }
    }

    fn record_for(video: &Arc<FakeVideo>) -> VideoRecord {
        let element: Arc<dyn VideoElement> = video.clone();
        VideoRecord::new(
            &element,
            SourceKey::for_element(element.as_ref()),
            "https://example.com/watch?v=1".into(),
        )
    }

    #[test]
    fn extracts_metadata_from_element_and_page() {
        let h = harness(vec![]);
        let video = FakeVideo::with_src("https://cdn.example/a.mp4");
        video.set_duration(61.5);
        video.set_dimensions(640, 360);
        video.set_current_time(3.0);

        let meta = h.requester.extract_metadata(video.as_ref());
        assert_eq!(meta.src.as_deref(), Some("https://cdn.example/a.mp4"));
        assert_eq!(meta.duration, Some(61.5));
        assert_eq!(meta.video_width, 640);
        assert_eq!(meta.video_height, 360);
        assert_eq!(meta.current_time, 3.0);
        assert_eq!(meta.volume, 1.0);
        assert_eq!(meta.playback_rate, 1.0);
        assert_eq!(meta.url, "https://example.com/watch?v=1");
        assert_eq!(meta.title, "Nursery rhymes");
    }

    #[test]
    fn unknown_duration_is_omitted() {
        let h = harness(vec![]);
        let video = FakeVideo::with_src("a.mp4");
        assert_eq!(h.requester.extract_metadata(video.as_ref()).duration, None);
    }

    #[tokio::test]
    async fn success_marks_analyzed_and_applies() {
        let h = harness(vec![MockReply::Reply(json!({
            "actions": { "reduceSpeed": true, "speedFactor": 0.5 }
        }))]);
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);

        let outcome = h.requester.analyze(&record).await;
        assert!(matches!(outcome, AnalysisOutcome::Applied(ref a) if a.playback_rate == Some(0.5)));
        assert!(record.is_analyzed());
        assert_eq!(video.playback_rate(), 0.5);
    }

    #[tokio::test]
    async fn analyzed_record_is_not_sent_again() {
        let h = harness(vec![MockReply::Reply(json!({ "actions": {} }))]);
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);

        h.requester.analyze(&record).await;
        let second = h.requester.analyze(&record).await;
        assert!(matches!(second, AnalysisOutcome::AlreadyAnalyzed));
        assert_eq!(h.relay.analyze_calls(), 1);
    }

    #[tokio::test]
    async fn failure_leaves_record_eligible() {
        let h = harness(vec![
            MockReply::Fail(RelayError::Disconnected),
            MockReply::Reply(json!({ "actions": { "applyFilters": true } })),
        ]);
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);

        let first = h.requester.analyze(&record).await;
        assert!(matches!(first, AnalysisOutcome::Failed(RelayError::Disconnected)));
        assert!(!record.is_analyzed());
        assert_eq!(video.filter(), "");

        let second = h.requester.analyze(&record).await;
        assert!(matches!(second, AnalysisOutcome::Applied(_)));
        assert!(record.is_analyzed());
        assert_eq!(h.relay.analyze_calls(), 2);
    }

    #[tokio::test]
    async fn malformed_reply_marks_analyzed_without_mitigation() {
        let h = harness(vec![MockReply::Reply(json!({ "actions": "slow down" }))]);
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);

        let outcome = h.requester.analyze(&record).await;
        assert!(matches!(outcome, AnalysisOutcome::Applied(ref a) if a.is_empty()));
        assert!(record.is_analyzed());
        assert_eq!(video.playback_rate(), 1.0);
    }

    #[tokio::test]
    async fn gone_element_sends_nothing() {
        let h = harness(vec![]);
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);
        drop(video);

        assert!(matches!(
            h.requester.analyze(&record).await,
            AnalysisOutcome::ElementGone
        ));
        assert_eq!(h.relay.analyze_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn verdict_for_previous_source_is_dropped() {
        let h = harness(vec![MockReply::delayed(
            Duration::from_secs(2),
            MockReply::Reply(json!({ "actions": { "reduceSpeed": true } })),
        )]);
        let video = FakeVideo::with_src("a.mp4");
        let record = record_for(&video);

        let analysis = h.requester.analyze(&record);
        let reload = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            record.reset_for_new_source();
        };
        let (outcome, ()) = tokio::join!(analysis, reload);

        assert!(matches!(outcome, AnalysisOutcome::Stale));
        assert!(!record.is_analyzed());
        assert_eq!(video.playback_rate(), 1.0);
    }
}
