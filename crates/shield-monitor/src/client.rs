use std::sync::Arc;

use serde_json::Value;
use shield_core::messages::{ErrorReply, RelayRequest};
use shield_core::{AnalysisResponse, RelayError, RelayTransport, SafetyActions, VideoMetadata};
use tracing::warn;

/// Typed requests over a raw [`RelayTransport`].
#[derive(Clone)]
pub struct RelayClient {
    transport: Arc<dyn RelayTransport>,
}

impl RelayClient {
    pub fn new(transport: Arc<dyn RelayTransport>) -> Self {
        Self { transport }
    }

    /// One `analyzeVideo` exchange.
    ///
    /// A reply whose `actions` cannot be read is still a reply: it comes back
    /// with `actions: None`, meaning no mitigation.
    pub async fn analyze(&self, metadata: VideoMetadata) -> Result<AnalysisResponse, RelayError> {
        let reply = self.request(&RelayRequest::AnalyzeVideo { data: metadata }).await?;
        Ok(parse_analysis(reply))
    }

    /// Ask the relay whether monitoring is enabled. `None` for a malformed reply.
    pub async fn status(&self) -> Result<Option<bool>, RelayError> {
        let reply = self.request(&RelayRequest::GetStatus).await?;
        Ok(reply.get("isEnabled").and_then(Value::as_bool))
    }

    async fn request(&self, request: &RelayRequest) -> Result<Value, RelayError> {
        let message =
            serde_json::to_value(request).map_err(|e| RelayError::Decode(e.to_string()))?;
        let reply = self.transport.send(message).await?;
        if let Some(err) = ErrorReply::from_value(&reply) {
            return Err(RelayError::Remote(err.error));
        }
        Ok(reply)
    }
}

fn parse_analysis(reply: Value) -> AnalysisResponse {
    let confidence = reply.get("confidence").and_then(Value::as_f64);
    let actions = match reply.get("actions") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<SafetyActions>(raw.clone()) {
            Ok(actions) => Some(actions),
            Err(e) => {
                warn!(error = %e, "malformed action set, applying no mitigation");
                None
            }
        },
    };
    AnalysisResponse {
        confidence,
        actions,
    }
}
