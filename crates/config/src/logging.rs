//! Logging configuration
//!
//! Controls level, per-crate overrides and output format of pipeline logs.

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "info"
/// format = "json"
/// directives = ["tempest_sinks=debug"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base level for every target
    pub level: LogLevel,

    pub format: LogFormat,

    /// Extra `EnvFilter` directives appended after the base level
    pub directives: Vec<String>,
}

impl LogConfig {
    /// Full filter string, e.g. `info,tempest_sinks=debug`
    pub fn filter_directive(&self) -> String {
        self.filter_with_level(self.level.as_str())
    }

    /// Same as [`filter_directive`](Self::filter_directive) with the base level replaced
    pub fn filter_with_level(&self, level: &str) -> String {
        std::iter::once(level)
            .chain(self.directives.iter().map(String::as_str))
            .filter(|d| !d.trim().is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty() {
        let config: LogConfig = toml::from_str("").unwrap();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Console);
        assert!(config.directives.is_empty());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
level = "debug"
format = "json"
directives = ["tempest_sinks=trace", "reqwest=warn"]
"#;
        let config: LogConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(
            config.filter_directive(),
            "debug,tempest_sinks=trace,reqwest=warn"
        );
    }

    #[test]
    fn test_filter_with_override_level() {
        let config = LogConfig {
            directives: vec!["hyper=warn".into(), " ".into()],
            ..Default::default()
        };
        assert_eq!(config.filter_with_level("trace"), "trace,hyper=warn");
    }

    #[test]
    fn test_rejects_unknown_level() {
        let result: Result<LogConfig, _> = toml::from_str("level = \"loud\"");
        assert!(result.is_err());
    }
}
