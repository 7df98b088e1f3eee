//! Pipeline error types
//!
//! Every failure keeps its kind on the way up. Feed and sink errors convert
//! losslessly into `PipelineError`; `RunError` adds the stage that failed.

use std::fmt;

use tempest_connectors::FeedError;
use tempest_sinks::SinkError;
use thiserror::Error;

/// Error kinds surfaced by orchestrator entry points
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Feed location could not be opened; a later run may succeed
    #[error("feed unavailable at '{location}': {reason}")]
    FeedUnavailable { location: String, reason: String },

    /// Feed content is malformed; retrying will not help
    #[error("feed parse error: {0}")]
    FeedParse(String),

    /// A sink required by the operation is switched off
    #[error("{0}")]
    CapabilityDisabled(String),

    /// A reachable downstream call failed
    #[error("{sink} delivery failed: {message}")]
    SinkDelivery { sink: &'static str, message: String },

    /// Bucket, function or trigger provisioning did not complete
    #[error("provisioning failed: {0}")]
    Provisioning(String),
}

impl PipelineError {
    /// Create a CapabilityDisabled error
    pub fn capability_disabled(msg: impl Into<String>) -> Self {
        Self::CapabilityDisabled(msg.into())
    }

    /// Only an unavailable feed is worth retrying as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FeedUnavailable { .. })
    }

    /// Short kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FeedUnavailable { .. } => "feed_unavailable",
            Self::FeedParse(_) => "feed_parse",
            Self::CapabilityDisabled(_) => "capability_disabled",
            Self::SinkDelivery { .. } => "sink_delivery",
            Self::Provisioning(_) => "provisioning",
        }
    }
}

impl From<FeedError> for PipelineError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Unavailable { location, reason } => Self::FeedUnavailable { location, reason },
            FeedError::Parse(msg) => Self::FeedParse(msg),
        }
    }
}

impl From<SinkError> for PipelineError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Disabled { sink } => {
                Self::CapabilityDisabled(format!("{sink} sink is disabled"))
            }
            SinkError::Delivery { sink, message } => Self::SinkDelivery { sink, message },
            SinkError::Provisioning(msg) => Self::Provisioning(msg),
        }
    }
}

/// States of one orchestrated run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Fetch,
    Publish,
    Archive,
    Done,
    Failed,
}

impl RunStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Publish => "publish",
            Self::Archive => "archive",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that ended in `FAILED`, with the stage it failed from
#[derive(Debug, Error)]
#[error("run failed during {stage}: {error}")]
pub struct RunError {
    pub stage: RunStage,
    #[source]
    pub error: PipelineError,
}

impl RunError {
    pub fn new(stage: RunStage, error: impl Into<PipelineError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
