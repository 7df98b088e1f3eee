//! Configuration validation
//!
//! Validates config consistency:
//! - Feed location and allow-list are present
//! - Enabled sinks name their targets
//! - Source and sink buckets differ
//! - Function descriptor is complete
//! - Scheduler delay is positive when scheduling is on

use crate::Config;
use crate::bus::BusBackend;
use crate::error::{ConfigError, Result};
use crate::index::IndexBackend;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_feed(config)?;
    validate_bus(config)?;
    validate_index(config)?;
    validate_archive(config)?;
    validate_scheduler(config)?;
    Ok(())
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn validate_http_url(section: &'static str, url: &str) -> Result<()> {
    if is_blank(url) {
        return Err(ConfigError::missing_field(section, "url"));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::invalid_value(
            section,
            "url",
            format!("'{}' must start with http:// or https://", url),
        ));
    }
    Ok(())
}

fn validate_feed(config: &Config) -> Result<()> {
    if is_blank(&config.feed.location) {
        return Err(ConfigError::missing_field("feed", "location"));
    }
    if config.feed.allowed_fields.is_empty() {
        return Err(ConfigError::missing_field("feed", "allowed_fields"));
    }
    Ok(())
}

fn validate_bus(config: &Config) -> Result<()> {
    let bus = &config.bus;
    if !bus.enabled {
        return Ok(());
    }
    if is_blank(&bus.topic) {
        return Err(ConfigError::missing_field("bus", "topic"));
    }
    match &bus.backend {
        BusBackend::Channel { capacity } if *capacity == 0 => Err(ConfigError::invalid_value(
            "bus",
            "capacity",
            "must be greater than 0",
        )),
        BusBackend::Channel { .. } => Ok(()),
        BusBackend::RestProxy { url, .. } => validate_http_url("bus", url),
    }
}

fn validate_index(config: &Config) -> Result<()> {
    let index = &config.index;
    if !index.enabled {
        return Ok(());
    }
    if index.default_limit == 0 {
        return Err(ConfigError::invalid_value(
            "index",
            "default_limit",
            "must be greater than 0",
        ));
    }
    match &index.backend {
        IndexBackend::Memory => Ok(()),
        IndexBackend::Elasticsearch { url, .. } => validate_http_url("index", url),
    }
}

fn validate_archive(config: &Config) -> Result<()> {
    let archive = &config.archive;
    if !archive.enabled {
        return Ok(());
    }
    if is_blank(&archive.source_bucket) {
        return Err(ConfigError::missing_field("archive", "source_bucket"));
    }
    if is_blank(&archive.sink_bucket) {
        return Err(ConfigError::missing_field("archive", "sink_bucket"));
    }
    if archive.source_bucket == archive.sink_bucket {
        return Err(ConfigError::invalid_value(
            "archive",
            "sink_bucket",
            "must differ from source_bucket",
        ));
    }
    if is_blank(&archive.key_prefix) {
        return Err(ConfigError::missing_field("archive", "key_prefix"));
    }
    if archive.storage.page_size() == 0 {
        return Err(ConfigError::invalid_value(
            "archive",
            "page_size",
            "must be greater than 0",
        ));
    }

    let function = &archive.function;
    if is_blank(&function.name) {
        return Err(ConfigError::missing_field("archive.function", "name"));
    }
    if is_blank(&function.handler) {
        return Err(ConfigError::missing_field("archive.function", "handler"));
    }
    if function.timeout_secs == 0 {
        return Err(ConfigError::invalid_value(
            "archive.function",
            "timeout_secs",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_scheduler(config: &Config) -> Result<()> {
    if config.scheduler.enabled && config.scheduler.fixed_delay_ms == 0 {
        return Err(ConfigError::invalid_value(
            "scheduler",
            "fixed_delay_ms",
            "must be greater than 0",
        ));
    }
    Ok(())
}
