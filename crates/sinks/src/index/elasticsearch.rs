//! Elasticsearch-compatible REST backend
//!
//! Documents are written with `PUT /{index}/_doc/{id}` (replace semantics)
//! and read with `POST /{index}/_search`. Exact clauses are `term` queries
//! on the `.keyword` sub-field; fuzzy clauses are `fuzzy` queries with
//! `AUTO` fuzziness on the analyzed field. Timestamp and `active` clauses
//! are plain `term` queries in either mode.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use tempest_protocol::{AlertQuery, AlertRecord, RecordField};

use super::{INDEX, MatchMode, SearchBackend};
use crate::common::SinkError;

/// Search request body for `query`
pub fn build_search_body(query: &AlertQuery, mode: MatchMode, limit: usize) -> Value {
    let clauses = query.clauses();
    if clauses.is_empty() {
        return json!({ "size": limit, "query": { "match_all": {} } });
    }

    let must: Vec<Value> = clauses
        .into_iter()
        .map(|(field, value)| match mode {
            // dates and booleans are not text-mapped
            _ if field.is_timestamp() || field == RecordField::Active => json!({
                "term": { (field.as_str()): value }
            }),
            MatchMode::Exact => json!({
                "term": { (format!("{}.keyword", field.as_str())): value }
            }),
            MatchMode::Fuzzy => json!({
                "fuzzy": {
                    (field.as_str()): { "value": value.to_lowercase(), "fuzziness": "AUTO" }
                }
            }),
        })
        .collect();

    json!({ "size": limit, "query": { "bool": { "must": must } } })
}

/// Records from the `hits.hits[]._source` of a search response
///
/// # Errors
///
/// Returns a message if the response shape or a document is unreadable
pub fn parse_hits(body: &Value) -> Result<Vec<AlertRecord>, String> {
    let hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| "response has no hits.hits array".to_string())?;

    hits.iter()
        .map(|hit| {
            let source = hit
                .get("_source")
                .ok_or_else(|| "hit has no _source".to_string())?;
            serde_json::from_value(source.clone()).map_err(|e| format!("bad document: {e}"))
        })
        .collect()
}

/// REST client for an Elasticsearch-compatible cluster
pub struct ElasticsearchBackend {
    base: Url,
    client: reqwest::Client,
}

impl ElasticsearchBackend {
    /// # Errors
    ///
    /// Returns error if `url` is not a valid base URL or the HTTP client cannot be created
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SinkError> {
        let base = Url::parse(url)
            .map_err(|e| SinkError::delivery(INDEX, format!("invalid url '{url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(SinkError::delivery(INDEX, format!("'{url}' cannot be a base URL")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::delivery(INDEX, format!("HTTP client: {e}")))?;
        Ok(Self { base, client })
    }

    /// URL with `segments` appended as escaped path segments
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post_search(&self, index: &str, body: Value) -> Result<Vec<AlertRecord>, SinkError> {
        let response = self
            .client
            .post(self.endpoint(&[index, "_search"]))
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::delivery(INDEX, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // index not created yet
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SinkError::delivery(
                INDEX,
                format!("search returned {status}: {detail}"),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SinkError::delivery(INDEX, format!("unreadable response: {e}")))?;
        parse_hits(&body).map_err(|e| SinkError::delivery(INDEX, e))
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn put(&self, index: &str, id: &str, record: &AlertRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .put(self.endpoint(&[index, "_doc", id]))
            .json(record)
            .send()
            .await
            .map_err(|e| SinkError::delivery(INDEX, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(SinkError::delivery(
                INDEX,
                format!("index {id} returned {status}: {detail}"),
            ))
        }
    }

    async fn select(&self, index: &str, limit: usize) -> Result<Vec<AlertRecord>, SinkError> {
        self.post_search(index, build_search_body(&AlertQuery::default(), MatchMode::Exact, limit))
            .await
    }

    async fn search(
        &self,
        index: &str,
        query: &AlertQuery,
        mode: MatchMode,
        limit: usize,
    ) -> Result<Vec<AlertRecord>, SinkError> {
        self.post_search(index, build_search_body(query, mode, limit))
            .await
    }
}
