//! REST proxy publisher
//!
//! Speaks the REST proxy v2 JSON produce API:
//! `POST {base}/topics/{topic}` with `{"records": [{"key": .., "value": ..}]}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tempest_protocol::AlertRecord;

use super::{BUS, Publisher};
use crate::common::SinkError;

const CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: [ProduceRecord<'a>; 1],
}

#[derive(Serialize)]
struct ProduceRecord<'a> {
    key: &'a str,
    value: &'a AlertRecord,
}

/// HTTP publisher for a broker REST proxy
pub struct RestProxyPublisher {
    base_url: String,
    client: reqwest::Client,
}

impl RestProxyPublisher {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::delivery(BUS, format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn topic_url(&self, topic: &str) -> String {
        format!("{}/topics/{}", self.base_url, topic)
    }
}

#[async_trait]
impl Publisher for RestProxyPublisher {
    fn name(&self) -> &'static str {
        "rest_proxy"
    }

    async fn send(&self, topic: &str, record: &AlertRecord) -> Result<(), SinkError> {
        let body = serde_json::to_vec(&ProduceRequest {
            records: [ProduceRecord {
                key: &record.id,
                value: record,
            }],
        })
        .map_err(|e| SinkError::delivery(BUS, format!("encode record {}: {e}", record.id)))?;

        let response = self
            .client
            .post(self.topic_url(topic))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::delivery(BUS, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(SinkError::delivery(
                BUS,
                format!("proxy returned {status}: {detail}"),
            ))
        }
    }
}
