//! HTTP client for the remote classification service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use shield_settings::ClassifierSettings;
use tracing::{debug, instrument};

/// Failure talking to the classification service.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("classifier returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("undecodable classifier reply: {0}")]
    Decode(String),
}

impl ClassifierError {
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Short classification string for log fields.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Network(e) if e.is_timeout() => "timeout",
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }
}

/// Something that turns a page URL into a raw action object.
#[async_trait]
pub trait Classify: Send + Sync {
    async fn classify(&self, page_url: &str) -> Result<Value, ClassifierError>;
}

/// POSTs `{ "url": ... }` to the configured endpoint.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(settings: &ClassifierSettings) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Classify for HttpClassifier {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn classify(&self, page_url: &str) -> Result<Value, ClassifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "url": page_url }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClassifierError::from_status(status.as_u16(), body));
        }

        let verdict: Value =
            serde_json::from_str(&body).map_err(|e| ClassifierError::Decode(e.to_string()))?;
        if !verdict.is_object() {
            return Err(ClassifierError::Decode(format!(
                "expected an action object, got {verdict}"
            )));
        }
        debug!("classifier answered");
        Ok(verdict)
    }
}
