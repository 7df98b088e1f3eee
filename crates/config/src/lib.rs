//! Tempest Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a working local setup: every sink enabled, in-memory
//! backings, the public alert feed as input.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tempest_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[bus]\ntopic = \"alerts\"").unwrap();
//! assert_eq!(config.bus.topic, "alerts");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [feed]
//! location = "https://alerts.weather.gov/cap/us.php?x=0"
//!
//! [bus]
//! topic = "weather-alerts"
//!
//! [index]
//! enabled = false
//!
//! [archive.storage]
//! type = "filesystem"
//! root = "data/buckets"
//!
//! [scheduler]
//! enabled = true
//! fixed_delay_ms = 60000
//! ```

mod archive;
mod bus;
mod error;
mod feed;
mod index;
mod logging;
mod scheduler;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use archive::{ArchiveConfig, FunctionConfig, SINK_BUCKET_ENV, StorageBackend};
pub use bus::{BusBackend, BusConfig};
pub use error::{ConfigError, Result};
pub use feed::{DEFAULT_FEED_URL, FeedConfig};
pub use index::{IndexBackend, IndexConfig};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use scheduler::SchedulerConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Alert feed input
    pub feed: FeedConfig,

    /// Pub/sub bus sink
    pub bus: BusConfig,

    /// Search index sink
    pub index: IndexConfig,

    /// Object store archive sink and its copy function
    pub archive: ArchiveConfig,

    /// Periodic end-to-end runs
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Names of sinks whose toggle is on
    pub fn enabled_sinks(&self) -> Vec<&'static str> {
        [
            ("bus", self.bus.enabled),
            ("index", self.index.enabled),
            ("archive", self.archive.enabled),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
