//! Traits over the hosting page.
//!
//! The page is untrusted and changes underneath the monitor: elements appear,
//! change source and disappear at any time. Implementations are expected to be
//! cheap handles onto host objects; all methods are synchronous except the
//! warning prompt, which waits on the viewer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::FrameAccessError;

/// Stable identity the host assigns to a DOM node.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Media events the monitor subscribes to.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum MediaEvent {
    /// The element started loading a (possibly new) source.
    LoadStart,
    Play,
}

pub type MediaListener = Arc<dyn Fn() + Send + Sync>;
pub type FrameLoadListener = Arc<dyn Fn() + Send + Sync>;

/// A live `<video>` element.
pub trait VideoElement: Send + Sync {
    fn element_id(&self) -> ElementId;

    /// The `src` attribute as resolved by the host.
    fn src(&self) -> Option<String>;
    /// The source actually selected for playback (covers `<source>` children).
    fn current_src(&self) -> Option<String>;

    /// `src` when non-empty, else `currentSrc` when non-empty.
    fn resolved_source(&self) -> Option<String> {
        self.src()
            .filter(|s| !s.is_empty())
            .or_else(|| self.current_src().filter(|s| !s.is_empty()))
    }

    /// Seconds; NaN until metadata has loaded.
    fn duration(&self) -> f64;
    fn video_width(&self) -> u32;
    fn video_height(&self) -> u32;
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);
    fn volume(&self) -> f64;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&self, rate: f64);
    fn is_paused(&self) -> bool;
    fn pause(&self);
    fn play(&self);

    /// Replace the element's visual filter expression. Empty clears it.
    fn set_filter(&self, expression: &str);

    /// False once the element has been removed from its document.
    fn is_connected(&self) -> bool;

    fn add_listener(&self, event: MediaEvent, listener: MediaListener);
}

/// A document the monitor can enumerate: the top-level page or the content
/// of an accessible nested frame.
pub trait PageDocument: Send + Sync {
    fn url(&self) -> String;
    fn title(&self) -> String;
    fn videos(&self) -> Vec<Arc<dyn VideoElement>>;
    fn frames(&self) -> Vec<Arc<dyn NestedFrame>>;
}

/// An `<iframe>` in a [`PageDocument`].
pub trait NestedFrame: Send + Sync {
    /// Human-readable label for logs, usually the frame's `src`.
    fn label(&self) -> String;

    fn on_load(&self, listener: FrameLoadListener) -> Result<(), FrameAccessError>;

    /// Fails for cross-origin content.
    fn content_document(&self) -> Result<Arc<dyn PageDocument>, FrameAccessError>;
}

/// The viewer's answer to a content warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    Continue,
    Skip,
}

/// Interrupts the viewer with a two-choice dialog.
#[async_trait]
pub trait WarningPrompt: Send + Sync {
    /// Resolves once the viewer answers. No timeout.
    async fn confirm(&self, text: &str) -> PromptOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sources {
        src: Option<String>,
        current: Option<String>,
    }

    impl VideoElement for Sources {
        fn element_id(&self) -> ElementId {
            ElementId(1)
        }
        fn src(&self) -> Option<String> {
            self.src.clone()
        }
        fn current_src(&self) -> Option<String> {
            self.current.clone()
        }
        fn duration(&self) -> f64 {
            f64::NAN
        }
        fn video_width(&self) -> u32 {
            0
        }
        fn video_height(&self) -> u32 {
            0
        }
        fn current_time(&self) -> f64 {
            0.0
        }
        fn set_current_time(&self, _seconds: f64) {}
        fn volume(&self) -> f64 {
            1.0
        }
        fn playback_rate(&self) -> f64 {
            1.0
        }
        fn set_playback_rate(&self, _rate: f64) {}
        fn is_paused(&self) -> bool {
            true
        }
        fn pause(&self) {}
        fn play(&self) {}
        fn set_filter(&self, _expression: &str) {}
        fn is_connected(&self) -> bool {
            true
        }
        fn add_listener(&self, _event: MediaEvent, _listener: MediaListener) {}
    }

    fn sources(src: Option<&str>, current: Option<&str>) -> Sources {
        Sources {
            src: src.map(String::from),
            current: current.map(String::from),
        }
    }

    #[test]
    fn resolved_source_prefers_src() {
        let v = sources(Some("a.mp4"), Some("b.mp4"));
        assert_eq!(v.resolved_source().as_deref(), Some("a.mp4"));
    }

    #[test]
    fn resolved_source_falls_back_to_current_src() {
        let v = sources(Some(""), Some("b.mp4"));
        assert_eq!(v.resolved_source().as_deref(), Some("b.mp4"));
        let v = sources(None, Some("b.mp4"));
        assert_eq!(v.resolved_source().as_deref(), Some("b.mp4"));
    }

    #[test]
    fn resolved_source_empty_is_none() {
        assert!(sources(Some(""), Some("")).resolved_source().is_none());
        assert!(sources(None, None).resolved_source().is_none());
    }
}
