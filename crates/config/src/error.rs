//! Errors from loading and validating `tempest.toml`

use std::io;
use thiserror::Error;

/// Result alias used across this crate
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Why a configuration could not be used
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A required value is empty
    #[error("{section} is missing required field '{field}'")]
    MissingField {
        /// Config section (e.g., "bus", "archive")
        section: &'static str,
        /// Missing field name
        field: &'static str,
    },

    /// A value is present but unusable
    #[error("{section} has invalid {field}: {message}")]
    InvalidValue {
        /// Config section
        section: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    pub fn missing_field(section: &'static str, field: &'static str) -> Self {
        Self::MissingField { section, field }
    }

    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}
