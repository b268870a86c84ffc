//! The BabyShield relay.
//!
//! Sits between monitor engines and the remote classification service:
//! - [`classifier`]: the HTTP client for the service
//! - [`relay`]: the message handler, settings persistence and toggle fan-out
//!
//! A classification failure never reaches an engine as an error; the relay
//! answers with the safe default action set instead.

pub mod classifier;
pub mod relay;

pub use classifier::{ClassifierError, Classify, HttpClassifier};
pub use relay::Relay;
