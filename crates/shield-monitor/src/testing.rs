//! In-memory host and relay doubles.
//!
//! `FakePage`/`FakeVideo`/`FakeFrame` stand in for a browser document,
//! `ScriptedPrompt` answers content warnings, and `MockRelay` replays
//! pre-programmed analysis replies with optional delays.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use shield_core::{
    ElementId, FrameAccessError, FrameLoadListener, MediaEvent, MediaListener, NestedFrame,
    PageDocument, PromptOutcome, RelayError, RelayTransport, VideoElement, WarningPrompt,
};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct VideoState {
    src: Option<String>,
    current_src: Option<String>,
    duration: f64,
    width: u32,
    height: u32,
    current_time: f64,
    volume: f64,
    playback_rate: f64,
    paused: bool,
    filter: String,
    connected: bool,
    pause_count: usize,
}

/// A scriptable `<video>` element.
///
/// `play()` and `load_source()` fire the matching listeners the way a browser
/// dispatches media events.
pub struct FakeVideo {
    id: ElementId,
    state: Mutex<VideoState>,
    listeners: Mutex<HashMap<MediaEvent, Vec<MediaListener>>>,
}

impl FakeVideo {
    fn build(src: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            id: ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed)),
            state: Mutex::new(VideoState {
                src,
                current_src: None,
                duration: f64::NAN,
                width: 0,
                height: 0,
                current_time: 0.0,
                volume: 1.0,
                playback_rate: 1.0,
                paused: true,
                filter: String::new(),
                connected: true,
                pause_count: 0,
            }),
            listeners: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_src(src: &str) -> Arc<Self> {
        Self::build(Some(src.to_string()))
    }

    pub fn without_src() -> Arc<Self> {
        Self::build(None)
    }

    pub fn set_current_src(&self, src: &str) {
        self.state.lock().current_src = Some(src.to_string());
    }

    /// Set the rate without going through the element API, as page script would.
    pub fn set_playback_rate_raw(&self, rate: f64) {
        self.state.lock().playback_rate = rate;
    }

    pub fn set_duration(&self, seconds: f64) {
        self.state.lock().duration = seconds;
    }

    pub fn set_dimensions(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.width = width;
        state.height = height;
    }

    /// Start playback and dispatch `play`.
    pub fn start_playing(&self) {
        self.state.lock().paused = false;
        self.fire(MediaEvent::Play);
    }

    /// Swap the source and dispatch `loadstart`.
    pub fn load_source(&self, src: &str) {
        {
            let mut state = self.state.lock();
            state.src = Some(src.to_string());
            state.current_time = 0.0;
        }
        self.fire(MediaEvent::LoadStart);
    }

    pub fn fire(&self, event: MediaEvent) {
        let listeners = self
            .listeners
            .lock()
            .get(&event)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener();
        }
    }

    pub fn filter(&self) -> String {
        self.state.lock().filter.clone()
    }

    pub fn pause_count(&self) -> usize {
        self.state.lock().pause_count
    }

    pub fn listener_count(&self, event: MediaEvent) -> usize {
        self.listeners.lock().get(&event).map_or(0, Vec::len)
    }

    /// Remove the element from its document.
    pub fn detach(&self) {
        self.state.lock().connected = false;
    }
}

impl VideoElement for FakeVideo {
    fn element_id(&self) -> ElementId {
        self.id
    }

    fn src(&self) -> Option<String> {
        self.state.lock().src.clone()
    }

    fn current_src(&self) -> Option<String> {
        self.state.lock().current_src.clone()
    }

    fn duration(&self) -> f64 {
        self.state.lock().duration
    }

    fn video_width(&self) -> u32 {
        self.state.lock().width
    }

    fn video_height(&self) -> u32 {
        self.state.lock().height
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
    }

    fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().playback_rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.state.lock().playback_rate = rate;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        state.paused = true;
        state.pause_count += 1;
    }

    fn play(&self) {
        self.start_playing();
    }

    fn set_filter(&self, expression: &str) {
        self.state.lock().filter = expression.to_string();
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn add_listener(&self, event: MediaEvent, listener: MediaListener) {
        self.listeners.lock().entry(event).or_default().push(listener);
    }
}

/// A document whose element list tests mutate directly.
pub struct FakePage {
    url: String,
    title: String,
    videos: Mutex<Vec<Arc<FakeVideo>>>,
    frames: Mutex<Vec<Arc<FakeFrame>>>,
}

impl FakePage {
    pub fn new(url: &str, title: &str) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            title: title.to_string(),
            videos: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
        })
    }

    pub fn add_video(&self, video: &Arc<FakeVideo>) {
        self.videos.lock().push(video.clone());
    }

    /// Detach and drop the page's handle on the element.
    pub fn remove_video(&self, video: &Arc<FakeVideo>) {
        video.detach();
        self.videos.lock().retain(|v| !Arc::ptr_eq(v, video));
    }

    pub fn add_frame(&self, frame: &Arc<FakeFrame>) {
        self.frames.lock().push(frame.clone());
    }
}

impl PageDocument for FakePage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn videos(&self) -> Vec<Arc<dyn VideoElement>> {
        self.videos
            .lock()
            .iter()
            .map(|v| v.clone() as Arc<dyn VideoElement>)
            .collect()
    }

    fn frames(&self) -> Vec<Arc<dyn NestedFrame>> {
        self.frames
            .lock()
            .iter()
            .map(|f| f.clone() as Arc<dyn NestedFrame>)
            .collect()
    }
}

/// An `<iframe>`; cross-origin when it has no readable content.
pub struct FakeFrame {
    label: String,
    content: Option<Arc<FakePage>>,
    load_listeners: Mutex<Vec<FrameLoadListener>>,
}

impl FakeFrame {
    pub fn same_origin(label: &str, content: Arc<FakePage>) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            content: Some(content),
            load_listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn cross_origin(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            content: None,
            load_listeners: Mutex::new(Vec::new()),
        })
    }

    /// Dispatch `load`.
    pub fn finish_loading(&self) {
        let listeners = self.load_listeners.lock().clone();
        for listener in listeners {
            listener();
        }
    }

    pub fn load_listener_count(&self) -> usize {
        self.load_listeners.lock().len()
    }
}

impl NestedFrame for FakeFrame {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn on_load(&self, listener: FrameLoadListener) -> Result<(), FrameAccessError> {
        self.load_listeners.lock().push(listener);
        Ok(())
    }

    fn content_document(&self) -> Result<Arc<dyn PageDocument>, FrameAccessError> {
        match &self.content {
            Some(page) => Ok(page.clone()),
            None => Err(FrameAccessError::CrossOrigin {
                frame: self.label.clone(),
            }),
        }
    }
}

/// Answers every warning with the same outcome and records the text shown.
pub struct ScriptedPrompt {
    outcome: PromptOutcome,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn always(outcome: PromptOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            asked: Mutex::new(Vec::new()),
        })
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl WarningPrompt for ScriptedPrompt {
    async fn confirm(&self, text: &str) -> PromptOutcome {
        self.asked.lock().push(text.to_string());
        self.outcome
    }
}

/// One programmed answer to an `analyzeVideo` request.
#[derive(Clone, Debug)]
pub enum MockReply {
    Reply(Value),
    Fail(RelayError),
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn delayed(delay: Duration, reply: MockReply) -> Self {
        Self::Delay(delay, Box::new(reply))
    }
}

/// A relay double.
///
/// `analyzeVideo` pops the next programmed reply; an exhausted queue answers
/// with `RelayError::Disconnected`. `getStatus` answers with the configured
/// status. Anything else gets the unknown-action error.
pub struct MockRelay {
    replies: Mutex<VecDeque<MockReply>>,
    status: Mutex<Result<Value, RelayError>>,
    requests: Mutex<Vec<Value>>,
    analyze_calls: AtomicUsize,
}

impl MockRelay {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            status: Mutex::new(Ok(json!({ "isEnabled": true }))),
            requests: Mutex::new(Vec::new()),
            analyze_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_status(self, status: Value) -> Self {
        *self.status.lock() = Ok(status);
        self
    }

    pub fn with_status_failure(self, error: RelayError) -> Self {
        *self.status.lock() = Err(error);
        self
    }

    /// Every message sent, in order.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }
}

async fn resolve(mut reply: MockReply) -> Result<Value, RelayError> {
    loop {
        match reply {
            MockReply::Reply(value) => return Ok(value),
            MockReply::Fail(error) => return Err(error),
            MockReply::Delay(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
        }
    }
}

#[async_trait]
impl RelayTransport for MockRelay {
    async fn send(&self, message: Value) -> Result<Value, RelayError> {
        self.requests.lock().push(message.clone());
        match message.get("action").and_then(Value::as_str) {
            Some("analyzeVideo") => {
                self.analyze_calls.fetch_add(1, Ordering::SeqCst);
                let next = self.replies.lock().pop_front();
                match next {
                    Some(reply) => resolve(reply).await,
                    None => Err(RelayError::Disconnected),
                }
            }
            Some("getStatus") => self.status.lock().clone(),
            _ => Ok(json!({ "error": "Unknown action" })),
        }
    }
}
