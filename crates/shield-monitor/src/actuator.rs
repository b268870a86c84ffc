use std::sync::Arc;

use shield_core::{PromptOutcome, SafetyActions, VideoElement, WarningPrompt};
use shield_settings::MonitorSettings;
use tracing::{debug, info, warn};

use crate::filters;
use crate::record::VideoRecord;

#[derive(Clone, Debug, PartialEq)]
pub struct ActuatorConfig {
    pub default_speed_factor: f64,
    pub default_warning_message: String,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self::from_settings(&MonitorSettings::default())
    }
}

impl ActuatorConfig {
    /// A non-positive or non-finite default speed factor falls back to 0.5.
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        let factor = settings.default_speed_factor;
        let default_speed_factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            let fallback = MonitorSettings::default().default_speed_factor;
            warn!(configured = factor, fallback, "default speed factor invalid, using fallback");
            fallback
        };
        Self {
            default_speed_factor,
            default_warning_message: settings.default_warning_message.clone(),
        }
    }
}

/// What [`SafetyActuator::apply`] actually changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppliedMitigations {
    pub playback_rate: Option<f64>,
    pub filter_expression: Option<String>,
    pub warning: Option<PromptOutcome>,
}

impl AppliedMitigations {
    pub fn is_empty(&self) -> bool {
        self.playback_rate.is_none() && self.filter_expression.is_none() && self.warning.is_none()
    }
}

/// Text shown in the interruption dialog.
pub fn warning_text(message: &str) -> String {
    format!(
        "\u{26a0}\u{fe0f} Content Warning\n\n{message}\n\nClick OK to continue watching, or Cancel to skip this video."
    )
}

/// Turns a verdict into changes on the video element.
pub struct SafetyActuator {
    config: ActuatorConfig,
    prompt: Arc<dyn WarningPrompt>,
}

impl SafetyActuator {
    pub fn new(config: ActuatorConfig, prompt: Arc<dyn WarningPrompt>) -> Self {
        Self { config, prompt }
    }

    /// Apply every mitigation the action set asks for: speed, then filters,
    /// then the warning. An absent set changes nothing. A detached element is
    /// skipped.
    pub async fn apply(
        &self,
        record: &VideoRecord,
        actions: Option<&SafetyActions>,
    ) -> AppliedMitigations {
        let mut applied = AppliedMitigations::default();
        let Some(actions) = actions else {
            debug!(video_id = %record.id(), "no action set, nothing to apply");
            return applied;
        };
        let Some(element) = record.live_element() else {
            debug!(video_id = %record.id(), "element gone before mitigation");
            return applied;
        };

        if actions.wants_reduced_speed() {
            let factor = actions.speed_factor_or(self.config.default_speed_factor);
            info!(video_id = %record.id(), factor, "reducing playback speed");
            element.set_playback_rate(factor);
            applied.playback_rate = Some(factor);
        }

        if actions.wants_filters() {
            let composed = filters::compose(&actions.filter_names());
            info!(video_id = %record.id(), filters = ?composed.applied, "applying visual filters");
            element.set_filter(&composed.expression);
            record.set_applied_filters(composed.applied);
            applied.filter_expression = Some(composed.expression);
        }

        if actions.wants_warning() {
            let message = actions.warning_message_or(&self.config.default_warning_message);
            applied.warning = self.show_warning(record, element, message).await;
        }

        applied
    }

    async fn show_warning(
        &self,
        record: &VideoRecord,
        element: Arc<dyn VideoElement>,
        message: &str,
    ) -> Option<PromptOutcome> {
        info!(video_id = %record.id(), "pausing for content warning");
        element.pause();

        let outcome = self.prompt.confirm(&warning_text(message)).await;

        if !element.is_connected() {
            debug!(video_id = %record.id(), "element detached while the warning was open");
            return Some(outcome);
        }
        match outcome {
            PromptOutcome::Continue => {
                info!(video_id = %record.id(), "viewer chose to continue");
                element.play();
            }
            PromptOutcome::Skip => {
                let duration = element.duration();
                if duration.is_finite() {
                    info!(video_id = %record.id(), "viewer chose to skip");
                    element.set_current_time(duration);
                } else {
                    debug!(video_id = %record.id(), "skip requested before duration is known");
                }
            }
        }
        Some(outcome)
    }

    /// Remove any visual filter from the record's element.
    pub fn clear_filters(record: &VideoRecord) {
        if let Some(element) = record.live_element() {
            element.set_filter("");
        }
        record.set_applied_filters(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceKey;
    use crate::testing::{FakeVideo, ScriptedPrompt};
    use serde_json::json;

    fn setup(video: &Arc<FakeVideo>, prompt: Arc<ScriptedPrompt>) -> (SafetyActuator, VideoRecord) {
        let element: Arc<dyn VideoElement> = video.clone();
        let record = VideoRecord::new(
            &element,
            SourceKey::for_element(element.as_ref()),
            "https://example.com".into(),
        );
        (SafetyActuator::new(ActuatorConfig::default(), prompt), record)
    }

    fn actions(value: serde_json::Value) -> SafetyActions {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn reduces_speed_with_factor() {
        let video = FakeVideo::with_src("a.mp4");
        let (actuator, record) = setup(&video, ScriptedPrompt::always(PromptOutcome::Continue));

        let applied = actuator
            .apply(&record, Some(&actions(json!({ "reduceSpeed": true, "speedFactor": 0.75 }))))
            .await;
        assert_eq!(applied.playback_rate, Some(0.75));
        assert_eq!(video.playback_rate(), 0.75);
    }

    #[test]
    fn invalid_default_factor_falls_back() {
        for factor in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let config = ActuatorConfig::from_settings(&MonitorSettings {
                default_speed_factor: factor,
                ..MonitorSettings::default()
            });
            assert_eq!(config.default_speed_factor, 0.5);
        }
        let config = ActuatorConfig::from_settings(&MonitorSettings {
            default_speed_factor: 0.25,
            ..MonitorSettings::default()
        });
        assert_eq!(config.default_speed_factor, 0.25);
    }

    #[tokio::test]
    async fn speed_defaults_to_half() {
        let video = FakeVideo::with_src("a.mp4");
        let (actuator, record) = setup(&video, ScriptedPrompt::always(PromptOutcome::Continue));

        actuator
            .apply(&record, Some(&actions(json!({ "reduceSpeed": true }))))
            .await;
        assert_eq!(video.playback_rate(), 0.5);
        assert_eq!(record.original_playback_rate(), 1.0);
    }

    #[tokio::test]
    async fn applies_filters_and_records_them() {
        let video = FakeVideo::with_src("a.mp4");
        let (actuator, record) = setup(&video, ScriptedPrompt::always(PromptOutcome::Continue));

        actuator
            .apply(
                &record,
                Some(&actions(json!({ "applyFilters": true, "filters": ["tone-down", "blur"] }))),
            )
            .await;
        assert_eq!(
            video.filter(),
            "brightness(0.8) contrast(0.9) saturate(0.7) blur(2px)"
        );
        assert_eq!(record.applied_filters(), vec!["tone-down", "blur"]);
    }

    #[tokio::test]
    async fn reapplying_filters_replaces_previous_expression() {
        let video = FakeVideo::with_src("a.mp4");
        let (actuator, record) = setup(&video, ScriptedPrompt::always(PromptOutcome::Continue));

        let blur = actions(json!({ "applyFilters": true, "filters": ["blur"] }));
        actuator.apply(&record, Some(&blur)).await;
        actuator.apply(&record, Some(&blur)).await;
        assert_eq!(video.filter(), "blur(2px)");

        let gray = actions(json!({ "applyFilters": true, "filters": ["grayscale"] }));
        actuator.apply(&record, Some(&gray)).await;
        assert_eq!(video.filter(), "grayscale(0.5)");
        assert_eq!(record.applied_filters(), vec!["grayscale"]);
    }

    #[tokio::test]
    async fn unknown_filter_is_tolerated() {
        let video = FakeVideo::with_src("a.mp4");
        let (actuator, record) = setup(&video, ScriptedPrompt::always(PromptOutcome::Continue));

        actuator
            .apply(
                &record,
                Some(&actions(json!({ "applyFilters": true, "filters": ["tone-down", "sparkle"] }))),
            )
            .await;
        assert_eq!(video.filter(), "brightness(0.8) contrast(0.9) saturate(0.7)");
    }

    #[tokio::test]
    async fn warning_skip_seeks_to_end_and_stays_paused() {
        let video = FakeVideo::with_src("a.mp4");
        video.set_duration(120.0);
        video.set_current_time(12.0);
        video.start_playing();
        let prompt = ScriptedPrompt::always(PromptOutcome::Skip);
        let (actuator, record) = setup(&video, prompt.clone());

        let applied = actuator
            .apply(&record, Some(&actions(json!({ "showWarning": true }))))
            .await;

        assert_eq!(applied.warning, Some(PromptOutcome::Skip));
        assert!(video.is_paused());
        assert_eq!(video.current_time(), 120.0);
        let asked = prompt.asked();
        assert_eq!(asked.len(), 1);
        assert!(asked[0].contains("This content may not be appropriate for children."));
        assert!(asked[0].starts_with("\u{26a0}\u{fe0f} Content Warning"));
    }

    #[tokio::test]
    async fn warning_continue_resumes_from_same_position() {
        let video = FakeVideo::with_src("a.mp4");
        video.set_duration(120.0);
        video.set_current_time(42.0);
        video.start_playing();
        let prompt = ScriptedPrompt::always(PromptOutcome::Continue);
        let (actuator, record) = setup(&video, prompt.clone());

        actuator
            .apply(
                &record,
                Some(&actions(json!({ "showWarning": true, "warningMessage": "Loud noises" }))),
            )
            .await;

        assert!(!video.is_paused());
        assert_eq!(video.current_time(), 42.0);
        assert_eq!(video.pause_count(), 1);
        assert!(prompt.asked()[0].contains("Loud noises"));
    }

    #[tokio::test]
    async fn all_actions_compose() {
        let video = FakeVideo::with_src("a.mp4");
        video.set_duration(30.0);
        let (actuator, record) = setup(&video, ScriptedPrompt::always(PromptOutcome::Skip));

        let applied = actuator
            .apply(
                &record,
                Some(&actions(json!({
                    "reduceSpeed": true,
                    "applyFilters": ["grayscale"],
                    "showWarning": true
                }))),
            )
            .await;
        assert_eq!(applied.playback_rate, Some(0.5));
        assert_eq!(applied.filter_expression.as_deref(), Some("grayscale(0.5)"));
        assert_eq!(applied.warning, Some(PromptOutcome::Skip));
    }

    #[tokio::test]
    async fn absent_or_false_actions_change_nothing() {
        let video = FakeVideo::with_src("a.mp4");
        let prompt = ScriptedPrompt::always(PromptOutcome::Skip);
        let (actuator, record) = setup(&video, prompt.clone());

        assert!(actuator.apply(&record, None).await.is_empty());
        assert!(actuator
            .apply(&record, Some(&SafetyActions::safe_default()))
            .await
            .is_empty());
        assert_eq!(video.playback_rate(), 1.0);
        assert_eq!(video.filter(), "");
        assert!(prompt.asked().is_empty());
    }

    #[tokio::test]
    async fn detached_element_is_left_alone() {
        let video = FakeVideo::with_src("a.mp4");
        let prompt = ScriptedPrompt::always(PromptOutcome::Skip);
        let (actuator, record) = setup(&video, prompt.clone());
        video.detach();

        let applied = actuator
            .apply(
                &record,
                Some(&actions(json!({ "reduceSpeed": true, "showWarning": true }))),
            )
            .await;
        assert!(applied.is_empty());
        assert_eq!(video.playback_rate(), 1.0);
        assert!(prompt.asked().is_empty());
    }

    #[tokio::test]
    async fn clear_filters_resets_expression() {
        let video = FakeVideo::with_src("a.mp4");
        let (actuator, record) = setup(&video, ScriptedPrompt::always(PromptOutcome::Continue));
        actuator
            .apply(&record, Some(&actions(json!({ "applyFilters": true }))))
            .await;
        assert_eq!(record.applied_filters(), vec!["tone-down"]);

        SafetyActuator::clear_filters(&record);
        assert_eq!(video.filter(), "");
        assert!(record.applied_filters().is_empty());
    }
}
