use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use shield_core::messages::{to_reply, AckReply, CountReply, EngineMessage, ErrorReply};
use shield_core::{PageDocument, RelayTransport, WarningPrompt};
use shield_settings::{MonitorSettings, SCAN_INTERVAL_MS_RANGE};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actuator::{ActuatorConfig, SafetyActuator};
use crate::client::RelayClient;
use crate::gate::EnabledGate;
use crate::registry::VideoRegistry;
use crate::requester::AnalysisRequester;
use crate::scanner::DiscoveryScanner;

#[derive(Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    pub scan_interval: Duration,
    pub actuator: ActuatorConfig,
}

impl MonitorConfig {
    /// An out-of-range scan interval falls back to the default period.
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        let (min, max) = SCAN_INTERVAL_MS_RANGE;
        let interval_ms = if (min..=max).contains(&settings.scan_interval_ms) {
            settings.scan_interval_ms
        } else {
            let fallback = MonitorSettings::default().scan_interval_ms;
            warn!(
                configured = settings.scan_interval_ms,
                fallback, "scan interval out of range, using default"
            );
            fallback
        };
        Self {
            scan_interval: Duration::from_millis(interval_ms),
            actuator: ActuatorConfig::from_settings(settings),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_settings(&MonitorSettings::default())
    }
}

/// Inbound message handling, shared with the broadcast forwarder.
#[derive(Clone)]
struct Inbound {
    gate: Arc<EnabledGate>,
    registry: Arc<VideoRegistry>,
}

impl Inbound {
    fn handle(&self, message: Value) -> Value {
        match serde_json::from_value::<EngineMessage>(message) {
            Ok(EngineMessage::GetVideoCount) => to_reply(&CountReply {
                count: self.registry.size(),
            }),
            Ok(EngineMessage::ToggleEnabled { is_enabled }) => {
                self.gate.on_toggle(is_enabled);
                to_reply(&AckReply::ok())
            }
            Err(e) => {
                debug!(error = %e, "unrecognized engine message");
                to_reply(&ErrorReply::unknown_action())
            }
        }
    }
}

/// One monitoring engine per page context.
///
/// Owns the registry and the gate, and wires the scanner, requester and
/// actuator together. Dropping the engine stops its background loops.
pub struct MonitorEngine {
    config: MonitorConfig,
    client: RelayClient,
    inbound: Inbound,
    scanner: Arc<DiscoveryScanner>,
    cancel: CancellationToken,
}

impl MonitorEngine {
    pub fn new(
        page: Arc<dyn PageDocument>,
        transport: Arc<dyn RelayTransport>,
        prompt: Arc<dyn WarningPrompt>,
        config: MonitorConfig,
    ) -> Self {
        let client = RelayClient::new(transport);
        let registry = Arc::new(VideoRegistry::new());
        let gate = Arc::new(EnabledGate::new());
        let actuator = SafetyActuator::new(config.actuator.clone(), prompt);
        let requester = Arc::new(AnalysisRequester::new(
            client.clone(),
            actuator,
            page.clone(),
        ));
        let scanner = DiscoveryScanner::new(page, registry.clone(), gate.clone(), requester);
        Self {
            config,
            client,
            inbound: Inbound { gate, registry },
            scanner,
            cancel: CancellationToken::new(),
        }
    }

    /// Bring the engine up: query the enabled state, scan the page, hook
    /// nested frames, then start the recurring scan.
    pub async fn start(&self) -> JoinHandle<()> {
        self.inbound.gate.initialize(&self.client).await;
        let found = self.scanner.initial_scan();
        let frames = self.scanner.watch_frames();
        info!(
            found,
            frames,
            interval_ms = self.config.scan_interval.as_millis() as u64,
            "monitor started"
        );
        tokio::spawn(
            self.scanner
                .clone()
                .run_recurring(self.config.scan_interval, self.cancel.child_token()),
        )
    }

    /// Answer `getVideoCount` and `toggleEnabled`.
    pub fn handle_message(&self, message: Value) -> Value {
        self.inbound.handle(message)
    }

    /// Forward every broadcast message to [`handle_message`](Self::handle_message)
    /// until the sender closes or the engine shuts down.
    pub fn attach_broadcast(&self, mut receiver: broadcast::Receiver<Value>) -> JoinHandle<()> {
        let inbound = self.inbound.clone();
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(message) => {
                            inbound.handle(message);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "broadcast receiver lagged");
                        }
                        Err(RecvError::Closed) => {
                            debug!("broadcast closed");
                            break;
                        }
                    },
                }
            }
        })
    }

    pub fn video_count(&self) -> usize {
        self.inbound.registry.size()
    }

    pub fn is_enabled(&self) -> bool {
        self.inbound.gate.is_enabled()
    }

    pub fn registry(&self) -> &Arc<VideoRegistry> {
        &self.inbound.registry
    }

    pub fn scanner(&self) -> &Arc<DiscoveryScanner> {
        &self.scanner
    }

    /// Wait for every analysis task spawned so far to finish.
    pub async fn settle(&self) {
        let tasks = self.scanner.tasks();
        tasks.close();
        tasks.wait().await;
        tasks.reopen();
    }

    /// Stop the recurring scan and broadcast forwarding. In-flight analysis
    /// tasks keep running to completion.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for MonitorEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
