//! Protocol error types

use thiserror::Error;

/// Errors raised while building records from raw feed values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Entry has no identifier URI
    #[error("entry is missing required field '{0}'")]
    MissingField(&'static str),

    /// Timestamp field could not be parsed as RFC 3339
    #[error("invalid timestamp in '{field}': {value}")]
    InvalidTimestamp {
        /// Column name
        field: &'static str,
        /// Raw text from the feed
        value: String,
    },
}

impl ProtocolError {
    /// Create an InvalidTimestamp error
    pub fn invalid_timestamp(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            field,
            value: value.into(),
        }
    }
}
