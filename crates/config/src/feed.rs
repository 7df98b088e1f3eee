//! Feed configuration

use std::time::Duration;

use serde::Deserialize;
use tempest_protocol::DEFAULT_CAP_FIELDS;

/// Default public alert feed
pub const DEFAULT_FEED_URL: &str = "https://alerts.weather.gov/cap/us.php?x=0";

/// Where to read alerts from and which extension fields to keep
///
/// # Example
///
/// ```toml
/// [feed]
/// location = "fixtures/warnings.xml"
/// allowed_fields = ["severity", "expires"]
/// timeout = "15s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// URL (`http://`, `https://`) or filesystem path
    pub location: String,

    /// Extension tag names copied into records
    pub allowed_fields: Vec<String>,

    /// HTTP request timeout
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with HTTP fetches
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            location: DEFAULT_FEED_URL.to_string(),
            allowed_fields: DEFAULT_CAP_FIELDS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("tempest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
