//! Bus sink - publishes alert records to a topic
//!
//! Records are sent one at a time in input order. The first failed send
//! aborts the rest of the batch. A disabled bus sends nothing and still
//! reports the input count.

mod channel;
mod rest_proxy;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempest_config::{BusBackend, BusConfig};
use tempest_protocol::{AlertRecord, ProcessingResult};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::common::{SinkError, SinkMetrics};
use crate::toggle::{Togglable, ToggleGate};

pub use channel::ChannelPublisher;
pub use rest_proxy::RestProxyPublisher;

/// Sink name used in errors and logs
pub const BUS: &str = "bus";

/// One record on a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    /// Partition key, the record id
    pub key: String,
    pub record: AlertRecord,
}

/// Transport for single-record sends
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, topic: &str, record: &AlertRecord) -> Result<(), SinkError>;
}

/// Toggle-gated topic publisher
pub struct BusSink {
    gate: ToggleGate,
    topic: String,
    publisher: Arc<dyn Publisher>,
    metrics: SinkMetrics,
}

impl BusSink {
    pub fn new(gate: ToggleGate, topic: impl Into<String>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            gate,
            topic: topic.into(),
            publisher,
            metrics: SinkMetrics::new(),
        }
    }

    /// Build from the `[bus]` section
    ///
    /// Returns the receiving end of the topic when the backing is an
    /// in-process channel.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn from_config(
        config: &BusConfig,
    ) -> Result<(Self, Option<mpsc::Receiver<BusMessage>>), SinkError> {
        let gate = ToggleGate::new(config.enabled);
        match &config.backend {
            BusBackend::Channel { capacity } => {
                let (publisher, rx) = ChannelPublisher::new(*capacity);
                Ok((Self::new(gate, &config.topic, Arc::new(publisher)), Some(rx)))
            }
            BusBackend::RestProxy { url, timeout } => {
                let publisher = RestProxyPublisher::new(url, *timeout)?;
                Ok((Self::new(gate, &config.topic, Arc::new(publisher)), None))
            }
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Publish every record in order
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Delivery` on the first failed send; later records
    /// are not attempted.
    pub async fn publish(&self, records: &[AlertRecord]) -> Result<ProcessingResult, SinkError> {
        if !self.enabled() {
            self.metrics.skip();
            debug!(
                topic = %self.topic,
                records = records.len(),
                bus_enabled = false,
                "bus disabled, nothing sent"
            );
            return Ok(ProcessingResult::for_count(records.len()));
        }

        self.metrics.received(records.len() as u64);
        for (sent, record) in records.iter().enumerate() {
            if let Err(e) = self.publisher.send(&self.topic, record).await {
                self.metrics.error();
                warn!(
                    topic = %self.topic,
                    publisher = self.publisher.name(),
                    record = %record.id,
                    sent,
                    error = %e,
                    "publish failed, aborting batch"
                );
                return Err(e);
            }
            self.metrics.delivered(1, 0);
        }

        let result = ProcessingResult::for_count(records.len());
        info!(
            topic = %self.topic,
            run_id = %result.run_id,
            records = result.record_count,
            status = result.status.as_str(),
            "published alerts"
        );
        Ok(result)
    }
}

impl Togglable for BusSink {
    fn enabled(&self) -> bool {
        self.gate.enabled()
    }
}

#[cfg(test)]
#[path = "bus_test.rs"]
mod bus_test;
