//! Tests for the bus sink

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempest_config::BusConfig;
use tempest_protocol::{AlertRecord, ProcessingStatus};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{BusSink, ChannelPublisher, Publisher, RestProxyPublisher};
use crate::common::SinkError;
use crate::test_util::records;
use crate::toggle::{Togglable, ToggleGate};

/// Accepts `fail_at` sends, then fails every call
struct FlakyPublisher {
    fail_at: usize,
    attempts: AtomicUsize,
}

impl FlakyPublisher {
    fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Publisher for FlakyPublisher {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn send(&self, _topic: &str, _record: &AlertRecord) -> Result<(), SinkError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n >= self.fail_at {
            Err(SinkError::delivery("bus", "broker unreachable"))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Enabled path
// ============================================================================

#[tokio::test]
async fn test_publish_in_order() {
    let (publisher, mut rx) = ChannelPublisher::new(16);
    let sink = BusSink::new(ToggleGate::on(), "weather-alerts", Arc::new(publisher));

    let input = records(3);
    let result = sink.publish(&input).await.unwrap();

    assert_eq!(result.record_count, 3);
    assert_eq!(result.status, ProcessingStatus::Success);

    for expected in &input {
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, "weather-alerts");
        assert_eq!(msg.key, expected.id);
        assert_eq!(&msg.record, expected);
    }
    assert!(rx.try_recv().is_err());
    assert_eq!(sink.metrics().snapshot().records_delivered, 3);
}

#[tokio::test]
async fn test_publish_empty_is_unprocessed() {
    let (publisher, _rx) = ChannelPublisher::new(1);
    let sink = BusSink::new(ToggleGate::on(), "t", Arc::new(publisher));

    let result = sink.publish(&[]).await.unwrap();
    assert_eq!(result.record_count, 0);
    assert_eq!(result.status, ProcessingStatus::Unprocessed);
}

#[tokio::test]
async fn test_publish_fails_fast() {
    let publisher = Arc::new(FlakyPublisher::new(2));
    let sink = BusSink::new(ToggleGate::on(), "t", publisher.clone());

    let err = sink.publish(&records(5)).await.unwrap_err();
    assert!(matches!(err, SinkError::Delivery { sink: "bus", .. }));

    // two successes plus the failing attempt, nothing after
    assert_eq!(publisher.attempts.load(Ordering::SeqCst), 3);
    let snapshot = sink.metrics().snapshot();
    assert_eq!(snapshot.records_delivered, 2);
    assert_eq!(snapshot.errors, 1);
}

#[tokio::test]
async fn test_closed_channel_is_delivery_error() {
    let (publisher, rx) = ChannelPublisher::new(4);
    drop(rx);
    let sink = BusSink::new(ToggleGate::on(), "t", Arc::new(publisher));

    let err = sink.publish(&records(1)).await.unwrap_err();
    assert!(err.to_string().contains("no consumer"));
}

// ============================================================================
// Disabled path
// ============================================================================

#[tokio::test]
async fn test_disabled_reports_input_count_without_sending() {
    let publisher = Arc::new(FlakyPublisher::new(0));
    let sink = BusSink::new(ToggleGate::off(), "t", publisher.clone());

    let result = sink.publish(&records(4)).await.unwrap();
    assert_eq!(result.record_count, 4);
    assert_eq!(result.status, ProcessingStatus::Success);
    assert_eq!(publisher.attempts.load(Ordering::SeqCst), 0);
    assert!(!sink.enabled());
    assert_eq!(sink.metrics().snapshot().skipped, 1);
}

#[tokio::test]
async fn test_from_config_channel_backend() {
    let config = BusConfig {
        topic: "alerts".into(),
        ..Default::default()
    };
    let (sink, rx) = BusSink::from_config(&config).unwrap();
    assert!(sink.enabled());
    assert_eq!(sink.topic(), "alerts");
    assert!(rx.is_some());
}

// ============================================================================
// REST proxy
// ============================================================================

#[tokio::test]
async fn test_rest_proxy_posts_to_topic() {
    let server = MockServer::start().await;
    let record = records(1).remove(0);

    Mock::given(method("POST"))
        .and(path("/topics/alerts"))
        .and(header("content-type", "application/vnd.kafka.json.v2+json"))
        .and(body_partial_json(serde_json::json!({
            "records": [ { "key": record.id, "value": { "id": record.id } } ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"offsets\":[]}"))
        .expect(1)
        .mount(&server)
        .await;

    let publisher =
        RestProxyPublisher::new(&format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
    assert_eq!(publisher.topic_url("alerts"), format!("{}/topics/alerts", server.uri()));

    publisher.send("alerts", &record).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_rest_proxy_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("unknown topic"))
        .mount(&server)
        .await;

    let publisher = RestProxyPublisher::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = publisher.send("missing", &records(1)[0]).await.unwrap_err();
    assert!(matches!(err, SinkError::Delivery { sink: "bus", .. }));
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("unknown topic"));
}

#[tokio::test]
async fn test_rest_proxy_unknown_path_is_not_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let publisher = RestProxyPublisher::new(&server.uri(), Duration::from_secs(5)).unwrap();
    assert!(publisher.send("other", &records(1)[0]).await.is_err());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
