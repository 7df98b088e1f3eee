//! Error and counter types shared by the bus, index and archive sinks

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Per-sink counters, updated with relaxed atomics
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Records handed to the sink
    pub records_received: AtomicU64,

    /// Records (or objects) delivered to the backing
    pub records_delivered: AtomicU64,

    /// Bytes written (archive uploads)
    pub bytes_written: AtomicU64,

    /// Delivery or provisioning failures
    pub errors: AtomicU64,

    /// Calls skipped because the sink is disabled
    pub skipped: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            records_received: AtomicU64::new(0),
            records_delivered: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn received(&self, count: u64) {
        self.records_received.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn delivered(&self, count: u64, bytes: u64) {
        self.records_delivered.fetch_add(count, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter once
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_delivered: self.records_delivered.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`SinkMetrics`] at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_received: u64,
    pub records_delivered: u64,
    pub bytes_written: u64,
    pub errors: u64,
    pub skipped: u64,
}

/// Common sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// A sink was asked to serve a query while its toggle is off
    #[error("{sink} sink is disabled")]
    Disabled { sink: &'static str },

    /// The backing rejected or could not receive a record, query or object
    #[error("{sink} delivery failed: {message}")]
    Delivery { sink: &'static str, message: String },

    /// Creating or updating a bucket, function or trigger failed
    #[error("provisioning failed: {0}")]
    Provisioning(String),
}

impl SinkError {
    /// Create a Disabled error
    pub fn disabled(sink: &'static str) -> Self {
        Self::Disabled { sink }
    }

    /// Create a Delivery error
    pub fn delivery(sink: &'static str, msg: impl Into<String>) -> Self {
        Self::Delivery {
            sink,
            message: msg.into(),
        }
    }

    /// Create a Provisioning error
    pub fn provisioning(msg: impl Into<String>) -> Self {
        Self::Provisioning(msg.into())
    }

    /// Name of the sink a delivery error came from
    pub fn sink(&self) -> Option<&'static str> {
        match self {
            Self::Disabled { sink } | Self::Delivery { sink, .. } => Some(sink),
            Self::Provisioning(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
