//! Bus sink configuration

use std::time::Duration;

use serde::Deserialize;

/// Bus backing
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusBackend {
    /// In-process topic channel (feeds the index bridge)
    Channel {
        /// Buffered messages before publishers wait
        #[serde(default = "default_capacity")]
        capacity: usize,
    },

    /// HTTP REST proxy in front of a broker
    RestProxy {
        /// Base URL, e.g. `http://localhost:8082`
        url: String,
        #[serde(default = "default_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
}

impl Default for BusBackend {
    fn default() -> Self {
        Self::Channel {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    1024
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Bus sink configuration
///
/// # Example
///
/// ```toml
/// [bus]
/// enabled = true
/// topic = "weather-alerts"
///
/// [bus.backend]
/// type = "rest_proxy"
/// url = "http://localhost:8082"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Resolved once at startup into the bus toggle gate
    pub enabled: bool,
    pub topic: String,
    pub backend: BusBackend,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            topic: "weather-alerts".to_string(),
            backend: BusBackend::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: BusConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.topic, "weather-alerts");
        assert_eq!(config.backend, BusBackend::Channel { capacity: 1024 });
    }

    #[test]
    fn test_rest_proxy_backend() {
        let config: BusConfig = toml::from_str(
            r#"
enabled = false
[backend]
type = "rest_proxy"
url = "http://proxy:8082"
"#,
        )
        .unwrap();
        assert!(!config.enabled);
        assert_eq!(
            config.backend,
            BusBackend::RestProxy {
                url: "http://proxy:8082".into(),
                timeout: Duration::from_secs(10),
            }
        );
    }
}
