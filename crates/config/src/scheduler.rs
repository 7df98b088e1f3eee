//! Fixed-delay scheduler configuration

use std::time::Duration;

use serde::Deserialize;

/// Periodic end-to-end runs
///
/// Intervals are plain milliseconds. The next run starts `fixed_delay_ms`
/// after the previous one finished.
///
/// # Example
///
/// ```toml
/// [scheduler]
/// enabled = true
/// fixed_delay_ms = 300000
/// initial_delay_ms = 5000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub fixed_delay_ms: u64,
    pub initial_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fixed_delay_ms: 300_000,
            initial_delay_ms: 1_000,
        }
    }
}

impl SchedulerConfig {
    pub fn fixed_delay(&self) -> Duration {
        Duration::from_millis(self.fixed_delay_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.fixed_delay(), Duration::from_secs(300));
        assert_eq!(config.initial_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_millisecond_values() {
        let config: SchedulerConfig =
            toml::from_str("enabled = true\nfixed_delay_ms = 250\ninitial_delay_ms = 0").unwrap();
        assert!(config.enabled);
        assert_eq!(config.fixed_delay(), Duration::from_millis(250));
        assert_eq!(config.initial_delay(), Duration::ZERO);
    }
}
