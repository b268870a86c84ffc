use std::sync::{Arc, Weak};
use std::time::Duration;

use shield_core::{MediaEvent, NestedFrame, PageDocument, VideoElement};
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::actuator::SafetyActuator;
use crate::gate::EnabledGate;
use crate::record::VideoRecord;
use crate::registry::VideoRegistry;
use crate::requester::AnalysisRequester;

/// Finds video elements and wires each new one to the analysis pipeline.
///
/// Listeners attached to elements and frames hold only a weak handle on the
/// scanner, so the page never keeps the engine alive.
pub struct DiscoveryScanner {
    page: Arc<dyn PageDocument>,
    registry: Arc<VideoRegistry>,
    gate: Arc<EnabledGate>,
    requester: Arc<AnalysisRequester>,
    tasks: TaskTracker,
    this: Weak<DiscoveryScanner>,
}

impl DiscoveryScanner {
    pub fn new(
        page: Arc<dyn PageDocument>,
        registry: Arc<VideoRegistry>,
        gate: Arc<EnabledGate>,
        requester: Arc<AnalysisRequester>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            page,
            registry,
            gate,
            requester,
            tasks: TaskTracker::new(),
            this: this.clone(),
        })
    }

    /// Analysis tasks spawned by play events.
    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    /// Register every video in the top-level document. Not gated.
    pub fn initial_scan(&self) -> usize {
        let found = self.scan_document(self.page.as_ref());
        info!(found, "initial scan complete");
        found
    }

    /// One tick of the recurring scan. Registers nothing while the gate is off.
    pub fn recurring_scan(&self) -> usize {
        if !self.gate.is_enabled() {
            debug!("monitoring disabled, skipping scan");
            return 0;
        }
        let found = self.scan_document(self.page.as_ref());
        if found > 0 {
            debug!(found, "recurring scan registered new videos");
        }
        found
    }

    /// Register the videos of `doc`; returns how many were new.
    pub fn scan_document(&self, doc: &dyn PageDocument) -> usize {
        let page_url = doc.url();
        let mut found = 0;
        for element in doc.videos() {
            let (record, is_new) = self.registry.register_if_new(&element, &page_url);
            if !is_new {
                continue;
            }
            found += 1;
            debug!(video_id = %record.id(), source = %record.source_key(), "registered video");
            self.attach_listeners(element.as_ref(), &record);
            if !element.is_paused() {
                self.request_analysis(record);
            }
        }
        found
    }

    /// Hook the load event of every nested frame in the top-level document.
    pub fn watch_frames(&self) -> usize {
        let mut hooked = 0;
        for frame in self.page.frames() {
            let scanner = self.this.clone();
            let weak_frame = Arc::downgrade(&frame);
            let on_load = Arc::new(move || {
                if let (Some(scanner), Some(frame)) = (scanner.upgrade(), weak_frame.upgrade()) {
                    scanner.scan_frame(frame.as_ref());
                }
            });
            match frame.on_load(on_load) {
                Ok(()) => hooked += 1,
                Err(e) => debug!(frame = %frame.label(), error = %e, "cannot hook nested frame"),
            }
        }
        hooked
    }

    /// Register the videos inside a loaded frame. An inaccessible frame yields zero.
    pub fn scan_frame(&self, frame: &dyn NestedFrame) -> usize {
        match frame.content_document() {
            Ok(doc) => {
                let found = self.scan_document(doc.as_ref());
                debug!(frame = %frame.label(), found, "scanned nested frame");
                found
            }
            Err(e) => {
                debug!(frame = %frame.label(), error = %e, "nested frame not accessible");
                0
            }
        }
    }

    /// Drive [`recurring_scan`](Self::recurring_scan) until `cancel` fires.
    /// The first tick comes one period after the call. A zero period never ticks.
    pub async fn run_recurring(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        if period.is_zero() {
            warn!("zero scan period, recurring scan disabled");
            return;
        }
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("recurring scan stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.recurring_scan();
                }
            }
        }
    }

    fn attach_listeners(&self, element: &dyn VideoElement, record: &Arc<VideoRecord>) {
        let on_load_start = {
            let record = record.clone();
            Arc::new(move || {
                debug!(video_id = %record.id(), "source changed, resetting");
                record.reset_for_new_source();
                SafetyActuator::clear_filters(&record);
            })
        };
        element.add_listener(MediaEvent::LoadStart, on_load_start);

        let on_play = {
            let record = record.clone();
            let scanner = self.this.clone();
            Arc::new(move || {
                if let Some(scanner) = scanner.upgrade() {
                    scanner.request_analysis(record.clone());
                }
            })
        };
        element.add_listener(MediaEvent::Play, on_play);
    }

    fn request_analysis(&self, record: Arc<VideoRecord>) {
        if record.is_analyzed() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!(video_id = %record.id(), "no async runtime, analysis not started");
            return;
        };
        let requester = self.requester.clone();
        self.tasks.spawn_on(
            async move {
                requester.analyze(&record).await;
            },
            &handle,
        );
    }
}
