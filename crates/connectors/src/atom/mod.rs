//! Atom feed source
//!
//! Reads an Atom document carrying CAP extension elements from a local file
//! or an HTTP(S) URL and converts each `<entry>` into an `AlertRecord`.

mod parser;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempest_config::FeedConfig;
use tempest_protocol::AlertRecord;
use tracing::{debug, info};

use crate::error::FeedError;
use crate::traits::FeedSource;

pub use parser::parse_feed;

/// Where the feed document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    File(PathBuf),
    Url(String),
}

impl FeedLocation {
    /// Classify a location string by scheme; anything not http(s) is a path
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for FeedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Atom/CAP feed source
pub struct AtomFeed {
    location: FeedLocation,
    allowed: HashSet<String>,
    client: reqwest::Client,
}

impl AtomFeed {
    /// Create a feed source
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails (e.g., TLS misconfiguration)
    pub fn new(
        location: FeedLocation,
        allowed: impl IntoIterator<Item = impl Into<String>>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::unavailable(location.to_string(), format!("HTTP client: {e}")))?;

        Ok(Self {
            location,
            allowed: allowed.into_iter().map(Into::into).collect(),
            client,
        })
    }

    /// Create a feed source from the `[feed]` config section
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn from_config(config: &FeedConfig) -> Result<Self, FeedError> {
        Self::new(
            FeedLocation::parse(&config.location),
            config.allowed_fields.iter().cloned(),
            config.timeout,
            &config.user_agent,
        )
    }

    /// Allow-listed extension tags
    pub fn allowed_fields(&self) -> &HashSet<String> {
        &self.allowed
    }

    async fn read_document(&self) -> Result<String, FeedError> {
        let location = self.location.to_string();
        let raw = match &self.location {
            FeedLocation::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| FeedError::unavailable(&location, e))?,
            FeedLocation::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| FeedError::unavailable(&location, e))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FeedError::unavailable(
                        &location,
                        format!("HTTP {status}"),
                    ));
                }

                response
                    .bytes()
                    .await
                    .map_err(|e| FeedError::unavailable(&location, e))?
                    .to_vec()
            }
        };
        decode_document(&location, raw)
    }
}

/// Feed documents must be UTF-8; anything else is malformed content
fn decode_document(location: &str, raw: Vec<u8>) -> Result<String, FeedError> {
    String::from_utf8(raw)
        .map_err(|e| FeedError::parse(format!("{location} is not valid UTF-8: {e}")))
}

#[async_trait]
impl FeedSource for AtomFeed {
    fn name(&self) -> &'static str {
        "atom"
    }

    fn location(&self) -> String {
        self.location.to_string()
    }

    async fn fetch(&self) -> Result<Vec<AlertRecord>, FeedError> {
        let document = self.read_document().await?;
        debug!(location = %self.location, bytes = document.len(), "feed document read");

        let records = parse_feed(&document, &self.allowed, Utc::now())?;
        let active = records.iter().filter(|r| r.active).count();
        info!(
            location = %self.location,
            records = records.len(),
            active,
            "feed parsed"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests;
