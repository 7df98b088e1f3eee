//! Index sink configuration

use std::time::Duration;

use serde::Deserialize;

/// Search index backing
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexBackend {
    /// In-process index
    #[default]
    Memory,

    /// Elasticsearch-compatible REST endpoint
    Elasticsearch {
        url: String,
        #[serde(default = "default_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Index sink configuration
///
/// # Example
///
/// ```toml
/// [index]
/// name = "weather-alerts"
///
/// [index.backend]
/// type = "elasticsearch"
/// url = "http://localhost:9200"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub enabled: bool,

    /// Index name; empty falls back to the record type name
    pub name: String,

    /// Page size for `select` when no limit is given
    /// Default: 10
    pub default_limit: usize,

    pub backend: IndexBackend,
}

impl IndexBackend {
    /// Documents live only as long as the process
    pub fn is_in_process(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "weather-alerts".to_string(),
            default_limit: 10,
            backend: IndexBackend::Memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: IndexConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.backend, IndexBackend::Memory);
    }

    #[test]
    fn test_elasticsearch_backend() {
        let config: IndexConfig = toml::from_str(
            r#"
name = ""
[backend]
type = "elasticsearch"
url = "http://es:9200"
timeout = "2s"
"#,
        )
        .unwrap();
        assert!(config.name.is_empty());
        assert_eq!(
            config.backend,
            IndexBackend::Elasticsearch {
                url: "http://es:9200".into(),
                timeout: Duration::from_secs(2),
            }
        );
    }
}
