//! Error types for feed sources

use tempest_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while fetching or parsing a feed
#[derive(Error, Debug)]
pub enum FeedError {
    /// Location could not be opened (missing file, network failure, HTTP error status)
    #[error("feed unavailable at '{location}': {reason}")]
    Unavailable { location: String, reason: String },

    /// Content is not a well-formed alert feed
    #[error("feed parse error: {0}")]
    Parse(String),
}

impl FeedError {
    /// Create an Unavailable error
    pub fn unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a Parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Transient failures may succeed on a later run; malformed content will not
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<ProtocolError> for FeedError {
    fn from(err: ProtocolError) -> Self {
        Self::Parse(err.to_string())
    }
}
