//! Bus-to-index bridge
//!
//! Consumes published messages and indexes each record under its own id.
//! Runs outside the orchestrated run; a record that fails to index is
//! logged and the bridge keeps consuming.

use std::sync::Arc;

use tempest_sinks::{BusMessage, IndexSink};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Indexes every record arriving on a topic
pub struct IndexBridge {
    index: Arc<IndexSink>,
    index_name: String,
}

impl IndexBridge {
    pub fn new(index: Arc<IndexSink>, index_name: impl Into<String>) -> Self {
        Self {
            index,
            index_name: index_name.into(),
        }
    }

    /// Index one message as `index(record, record.id, index_name)`
    pub async fn handle(&self, message: &BusMessage) -> bool {
        let record = &message.record;
        match self.index.index(record, Some(&record.id), &self.index_name).await {
            Ok(Some(id)) => {
                debug!(topic = %message.topic, id = %id, "bridged record");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(
                    topic = %message.topic,
                    id = %record.id,
                    error = %e,
                    "failed to index bridged record"
                );
                false
            }
        }
    }

    /// Consume until the channel closes or `cancel` fires
    ///
    /// Messages already queued at cancellation are still indexed. Returns
    /// the number of records indexed.
    pub async fn run(self, mut messages: mpsc::Receiver<BusMessage>, cancel: CancellationToken) -> u64 {
        info!(index = %self.index_name, "index bridge started");
        let mut indexed = 0u64;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    while let Ok(message) = messages.try_recv() {
                        if self.handle(&message).await {
                            indexed += 1;
                        }
                    }
                    break;
                }
                message = messages.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    if self.handle(&message).await {
                        indexed += 1;
                    }
                }
            }
        }
        info!(index = %self.index_name, indexed, "index bridge stopped");
        indexed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use tempest_protocol::AlertRecord;
    use tempest_sinks::{ChannelPublisher, MemoryIndex, Publisher, ToggleGate};

    use super::*;

    fn alert(id: &str) -> AlertRecord {
        AlertRecord {
            id: id.to_string(),
            title: format!("Alert {id}"),
            summary: None,
            category: Some("Met".into()),
            area_desc: Some("Kodiak Island".into()),
            severity: Some("Severe".into()),
            urgency: None,
            certainty: None,
            effective: None,
            expires: Some(Utc::now() + Duration::hours(1)),
            updated: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_bridge_indexes_by_record_id() {
        let backend = Arc::new(MemoryIndex::new());
        let index = Arc::new(IndexSink::new(ToggleGate::on(), backend.clone()));
        let (publisher, rx) = ChannelPublisher::new(8);

        publisher.send("weather-alerts", &alert("a")).await.unwrap();
        publisher.send("weather-alerts", &alert("b")).await.unwrap();
        // Replacing "a" keeps one document
        publisher.send("weather-alerts", &alert("a")).await.unwrap();
        drop(publisher);

        let bridge = IndexBridge::new(index, "weather-alerts");
        let indexed = bridge.run(rx, CancellationToken::new()).await;

        assert_eq!(indexed, 3);
        assert_eq!(backend.len("weather-alerts"), 2);
        assert!(backend.get("weather-alerts", "a").is_some());
    }

    #[tokio::test]
    async fn test_disabled_index_skips() {
        let backend = Arc::new(MemoryIndex::new());
        let index = Arc::new(IndexSink::new(ToggleGate::off(), backend.clone()));
        let (publisher, rx) = ChannelPublisher::new(8);
        publisher.send("weather-alerts", &alert("a")).await.unwrap();
        drop(publisher);

        let indexed = IndexBridge::new(index, "weather-alerts")
            .run(rx, CancellationToken::new())
            .await;
        assert_eq!(indexed, 0);
        assert!(backend.is_empty("weather-alerts"));
    }

    #[tokio::test]
    async fn test_cancel_drains_queued_messages() {
        let backend = Arc::new(MemoryIndex::new());
        let index = Arc::new(IndexSink::new(ToggleGate::on(), backend.clone()));
        let (publisher, rx) = ChannelPublisher::new(8);
        publisher.send("weather-alerts", &alert("a")).await.unwrap();
        publisher.send("weather-alerts", &alert("b")).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let indexed = IndexBridge::new(index, "weather-alerts").run(rx, cancel).await;
        assert_eq!(indexed, 2);
        assert_eq!(backend.len("weather-alerts"), 2);
        drop(publisher);
    }

    #[tokio::test]
    async fn test_bridge_stops_on_cancel() {
        let index = Arc::new(IndexSink::new(ToggleGate::on(), Arc::new(MemoryIndex::new())));
        let (_publisher, rx) = ChannelPublisher::new(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let indexed = IndexBridge::new(index, "weather-alerts").run(rx, cancel).await;
        assert_eq!(indexed, 0);
    }
}
