//! In-process topic channel

use async_trait::async_trait;
use tempest_protocol::AlertRecord;
use tokio::sync::mpsc;

use super::{BUS, BusMessage, Publisher};
use crate::common::SinkError;

/// Publishes onto a bounded channel; the receiver is the topic consumer
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<BusMessage>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BusMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn send(&self, topic: &str, record: &AlertRecord) -> Result<(), SinkError> {
        let message = BusMessage {
            topic: topic.to_string(),
            key: record.id.clone(),
            record: record.clone(),
        };
        self.tx
            .send(message)
            .await
            .map_err(|_| SinkError::delivery(BUS, format!("topic '{topic}' has no consumer")))
    }
}
