use std::time::Duration;

/// Failure of a single request/response exchange with the relay.
///
/// None of these are fatal to the page: the monitor logs them and leaves the
/// video eligible for another attempt on its next qualifying play event.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay disconnected")]
    Disconnected,
    #[error("relay timed out after {0:?}")]
    Timeout(Duration),
    #[error("relay reported: {0}")]
    Remote(String),
    #[error("malformed relay message: {0}")]
    Decode(String),
}

impl RelayError {
    /// Short classification string for log fields.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Timeout(_) => "timeout",
            Self::Remote(_) => "remote",
            Self::Decode(_) => "decode",
        }
    }
}

/// Why a nested frame's content could not be inspected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameAccessError {
    #[error("cross-origin frame {frame} is not accessible")]
    CrossOrigin { frame: String },
    #[error("frame is detached from the page")]
    Detached,
}
