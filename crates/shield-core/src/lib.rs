//! Shared vocabulary for the BabyShield video monitor.
//!
//! Nothing in this crate performs I/O. The monitor engine, the relay and the
//! CLI agree on the types defined here:
//! - [`ids`]: branded identifiers
//! - [`actions`]: the safety action set returned by the classification boundary
//! - [`metadata`]: the per-video metadata sent for analysis
//! - [`messages`]: the JSON message shapes exchanged with the relay
//! - [`host`]: traits over the hosting page (video elements, frames, prompts)
//! - [`transport`]: the raw request/response channel to the relay

pub mod actions;
pub mod errors;
pub mod host;
pub mod ids;
pub mod messages;
pub mod metadata;
pub mod transport;

pub use actions::{AnalysisResponse, FilterToggle, SafetyActions};
pub use errors::{FrameAccessError, RelayError};
pub use host::{
    ElementId, FrameLoadListener, MediaEvent, MediaListener, NestedFrame, PageDocument,
    PromptOutcome, VideoElement, WarningPrompt,
};
pub use ids::VideoId;
pub use metadata::VideoMetadata;
pub use transport::RelayTransport;
