//! Content-side monitoring for BabyShield.
//!
//! A [`MonitorEngine`] runs once per page context. It discovers video
//! elements (including late arrivals and same-origin nested frames),
//! deduplicates them by source, requests one analysis per source when the
//! video plays, and applies the returned safety actions to the element.
//!
//! ```text
//! DiscoveryScanner -> VideoRegistry -> (play) AnalysisRequester
//!     -> relay -> SafetyActuator -> video element
//! ```
//!
//! The host page is reached only through the traits in [`shield_core::host`];
//! [`testing`] has in-memory implementations.

pub mod actuator;
pub mod client;
pub mod engine;
pub mod filters;
pub mod gate;
pub mod record;
pub mod registry;
pub mod requester;
pub mod scanner;
pub mod testing;

pub use actuator::{ActuatorConfig, AppliedMitigations, SafetyActuator};
pub use client::RelayClient;
pub use engine::{MonitorConfig, MonitorEngine};
pub use filters::{FilterComposition, VisualFilter};
pub use gate::EnabledGate;
pub use record::{SourceKey, VideoRecord};
pub use registry::VideoRegistry;
pub use requester::{AnalysisOutcome, AnalysisRequester};
pub use scanner::DiscoveryScanner;
