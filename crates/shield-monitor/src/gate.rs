use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::client::RelayClient;

/// Whether the recurring discovery scan runs.
///
/// Starts enabled. Already-registered videos keep their listeners whatever
/// the gate says.
#[derive(Debug)]
pub struct EnabledGate {
    enabled: AtomicBool,
}

impl EnabledGate {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Query the relay once; keep the current value unless the reply is well-formed.
    pub async fn initialize(&self, client: &RelayClient) {
        match client.status().await {
            Ok(Some(enabled)) => {
                self.enabled.store(enabled, Ordering::Release);
                info!(enabled, "initial enabled state");
            }
            Ok(None) => warn!("malformed status reply, keeping default enabled state"),
            Err(e) => warn!(error = %e, kind = e.error_kind(), "status query failed, keeping default enabled state"),
        }
    }

    /// Toggle notification from the relay.
    pub fn on_toggle(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        info!(enabled, "monitoring toggled");
    }
}

impl Default for EnabledGate {
    fn default() -> Self {
        Self::new()
    }
}
