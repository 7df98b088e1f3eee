//! Tests for the index sink and its backends

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use tempest_config::IndexConfig;
use tempest_protocol::{AlertQuery, AlertRecord};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{
    ElasticsearchBackend, FALLBACK_INDEX_NAME, IndexSink, MatchMode, MemoryIndex, SearchBackend,
    build_search_body, parse_hits, resolve_index_name,
};
use crate::common::SinkError;
use crate::test_util::{record, record_with, records};
use crate::toggle::{Togglable, ToggleGate};

fn memory_sink() -> (IndexSink, Arc<MemoryIndex>) {
    let backend = Arc::new(MemoryIndex::new());
    (IndexSink::new(ToggleGate::on(), backend.clone()), backend)
}

async fn seed(sink: &IndexSink, index: &str) {
    for r in [
        record_with("a", "Severe", "Tanana Valley"),
        record_with("b", "Moderate", "Ventura County Mountains"),
        record_with("c", "Severe", "Coastal Miami-Dade"),
        record_with("d", "Minor", "Hays; Travis"),
    ] {
        sink.index(&r, Some(&r.id), index).await.unwrap();
    }
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_index_with_explicit_id() {
    let (sink, backend) = memory_sink();
    let r = record("2021-04-01-1234");

    let id = sink.index(&r, Some("2021-04-01-1234"), "alerts").await.unwrap();
    assert_eq!(id.as_deref(), Some("2021-04-01-1234"));
    assert_eq!(backend.get("alerts", "2021-04-01-1234"), Some(r));
}

#[tokio::test]
async fn test_index_without_id_generates_one() {
    let (sink, backend) = memory_sink();

    let a = sink.index(&record("x"), None, "alerts").await.unwrap().unwrap();
    let b = sink.index(&record("x"), Some("  "), "alerts").await.unwrap().unwrap();

    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
    assert_eq!(backend.len("alerts"), 2);
}

#[tokio::test]
async fn test_index_replaces_existing_id() {
    let (sink, backend) = memory_sink();

    sink.index(&record("first"), Some("k"), "alerts").await.unwrap();
    let replacement = record_with("second", "Extreme", "Kodiak");
    sink.index(&replacement, Some("k"), "alerts").await.unwrap();

    assert_eq!(backend.len("alerts"), 1);
    assert_eq!(backend.get("alerts", "k"), Some(replacement));
}

#[tokio::test]
async fn test_disabled_index_is_noop() {
    let backend = Arc::new(MemoryIndex::new());
    let sink = IndexSink::new(ToggleGate::off(), backend.clone());

    assert_eq!(sink.index(&record("a"), Some("a"), "alerts").await.unwrap(), None);
    assert!(backend.is_empty("alerts"));
    assert_eq!(sink.metrics().snapshot().skipped, 1);
}

#[tokio::test]
async fn test_empty_index_name_falls_back() {
    let (sink, backend) = memory_sink();
    sink.index(&record("a"), Some("a"), "").await.unwrap();
    assert_eq!(backend.len(FALLBACK_INDEX_NAME), 1);
    assert_eq!(resolve_index_name(" alerts "), "alerts");
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_select_all_default_limit() {
    let (sink, _) = memory_sink();
    for r in records(15) {
        sink.index(&r, Some(&r.id), "alerts").await.unwrap();
    }

    let page = sink.select_all("alerts", None).await.unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page[0].id, "2021-04-01-0000");

    assert_eq!(sink.select_all("alerts", Some(3)).await.unwrap().len(), 3);
    assert_eq!(sink.select_all("alerts", Some(50)).await.unwrap().len(), 15);
    assert!(sink.select_all("other", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_configured_default_limit() {
    let config = IndexConfig {
        default_limit: 2,
        ..Default::default()
    };
    let sink = IndexSink::from_config(&config).unwrap();
    for r in records(5) {
        sink.index(&r, Some(&r.id), "alerts").await.unwrap();
    }
    assert_eq!(sink.select_all("alerts", None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_exact_search_on_severity_only() {
    let (sink, _) = memory_sink();
    seed(&sink, "alerts").await;

    let hits = sink
        .search(&AlertQuery::new().with_severity("Severe"), "alerts", false)
        .await
        .unwrap();
    let ids: Vec<_> = hits.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn test_exact_search_is_conjunction() {
    let (sink, _) = memory_sink();
    seed(&sink, "alerts").await;

    let query = AlertQuery::new()
        .with_severity("Severe")
        .with_area("Coastal Miami-Dade");
    let hits = sink.search(&query, "alerts", false).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "c");

    let none = AlertQuery::new().with_severity("severe");
    assert!(sink.search(&none, "alerts", false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fuzzy_search_tolerates_typos() {
    let (sink, _) = memory_sink();
    seed(&sink, "alerts").await;

    let hits = sink
        .search(&AlertQuery::new().with_severity("Sever"), "alerts", true)
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);

    let hits = sink
        .search(&AlertQuery::new().with_area("ventra"), "alerts", true)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "b");
}

#[tokio::test]
async fn test_search_on_summary_timestamps_and_active() {
    let (sink, _) = memory_sink();
    let expires = Utc.with_ymd_and_hms(2031, 4, 1, 18, 0, 0).unwrap();
    let flood = AlertRecord {
        summary: Some("River flooding expected".into()),
        expires: Some(expires),
        ..record("f")
    };
    let lapsed = AlertRecord {
        active: false,
        expires: None,
        ..record("g")
    };
    for r in [&flood, &lapsed] {
        sink.index(r, Some(&r.id), "alerts").await.unwrap();
    }

    let by_summary = AlertQuery::new().with_summary("River flooding expected");
    let hits = sink.search(&by_summary, "alerts", false).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "f");

    // same instant written with an offset
    let by_expiry = AlertQuery::new().with_expires("2031-04-01T20:00:00+02:00");
    for fuzzy in [false, true] {
        let hits = sink.search(&by_expiry, "alerts", fuzzy).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "f");
    }
    let unparseable = AlertQuery::new().with_expires("next tuesday");
    assert!(sink.search(&unparseable, "alerts", false).await.unwrap().is_empty());

    let inactive = AlertQuery::new().with_active(false);
    let hits = sink.search(&inactive, "alerts", true).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "g");
}

#[tokio::test]
async fn test_empty_query_matches_everything() {
    let (sink, _) = memory_sink();
    seed(&sink, "alerts").await;
    assert_eq!(sink.search(&AlertQuery::new(), "alerts", false).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_reads_rejected_when_disabled() {
    let sink = IndexSink::new(ToggleGate::off(), Arc::new(MemoryIndex::new()));
    assert!(!sink.enabled());

    let err = sink.select_all("alerts", None).await.unwrap_err();
    assert!(matches!(err, SinkError::Disabled { sink: "index" }));

    let err = sink.search(&AlertQuery::new(), "alerts", true).await.unwrap_err();
    assert!(matches!(err, SinkError::Disabled { .. }));
}

// ============================================================================
// Elasticsearch request/response shapes
// ============================================================================

#[test]
fn test_search_body_match_all() {
    let body = build_search_body(&AlertQuery::new(), MatchMode::Exact, 10);
    assert_eq!(body, json!({ "size": 10, "query": { "match_all": {} } }));
}

#[test]
fn test_search_body_exact_terms() {
    let query = AlertQuery::new().with_severity("Severe").with_urgency("Immediate");
    let body = build_search_body(&query, MatchMode::Exact, 5);
    assert_eq!(
        body,
        json!({
            "size": 5,
            "query": { "bool": { "must": [
                { "term": { "severity.keyword": "Severe" } },
                { "term": { "urgency.keyword": "Immediate" } }
            ] } }
        })
    );
}

#[test]
fn test_search_body_fuzzy() {
    let query = AlertQuery::new().with_area("Kodiak");
    let body = build_search_body(&query, MatchMode::Fuzzy, 10);
    assert_eq!(
        body["query"]["bool"]["must"][0],
        json!({ "fuzzy": { "areaDesc": { "value": "kodiak", "fuzziness": "AUTO" } } })
    );
}

#[test]
fn test_search_body_timestamp_and_active_terms() {
    let query = AlertQuery::new()
        .with_expires("2031-04-01T18:00:00Z")
        .with_active(true);
    for mode in [MatchMode::Exact, MatchMode::Fuzzy] {
        let body = build_search_body(&query, mode, 10);
        assert_eq!(
            body["query"]["bool"]["must"],
            json!([
                { "term": { "expires": "2031-04-01T18:00:00Z" } },
                { "term": { "active": "true" } }
            ])
        );
    }
}

#[test]
fn test_parse_hits() {
    let original = record("a");
    let doc = serde_json::to_value(&original).unwrap();
    let body = json!({ "hits": { "total": { "value": 1 }, "hits": [ { "_id": "a", "_source": doc } ] } });
    assert_eq!(parse_hits(&body).unwrap(), vec![original]);

    assert!(parse_hits(&json!({ "error": "boom" })).is_err());
    assert!(parse_hits(&json!({ "hits": { "hits": [ { "_id": "x" } ] } })).is_err());
}

#[test]
fn test_endpoint_escapes_segments() {
    let es = ElasticsearchBackend::new("http://localhost:9200/", Duration::from_secs(1)).unwrap();
    assert_eq!(
        es.endpoint(&["alerts", "_doc", "a b"]).as_str(),
        "http://localhost:9200/alerts/_doc/a%20b"
    );
    assert!(ElasticsearchBackend::new("not a url", Duration::from_secs(1)).is_err());
}

#[tokio::test]
async fn test_elasticsearch_put_and_search() {
    let server = MockServer::start().await;
    let doc = serde_json::to_value(record_with("c", "Severe", "Kodiak")).unwrap();

    Mock::given(method("PUT"))
        .and(path("/alerts/_doc/c"))
        .and(body_partial_json(json!({ "id": "c", "severity": "Severe" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "result": "created" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/alerts/_search"))
        .and(body_partial_json(json!({
            "size": 10,
            "query": { "bool": { "must": [ { "term": { "severity.keyword": "Severe" } } ] } }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "hits": { "hits": [ { "_source": doc } ] } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/missing/_search"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "index_not_found_exception" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let es = ElasticsearchBackend::new(&server.uri(), Duration::from_secs(5)).unwrap();
    es.put("alerts", "c", &record_with("c", "Severe", "Kodiak")).await.unwrap();

    let hits = es
        .search("alerts", &AlertQuery::new().with_severity("Severe"), MatchMode::Exact, 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "c");

    assert!(es.select("missing", 10).await.unwrap().is_empty());

    server.verify().await;
}

#[tokio::test]
async fn test_elasticsearch_rejected_put_is_delivery_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/alerts/_doc/a"))
        .respond_with(ResponseTemplate::new(400).set_body_string("mapper_parsing_exception"))
        .mount(&server)
        .await;

    let es = ElasticsearchBackend::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = es.put("alerts", "a", &record("a")).await.unwrap_err();
    assert!(matches!(err, SinkError::Delivery { sink: "index", .. }));
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_elasticsearch_unreachable_is_delivery_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let es = ElasticsearchBackend::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let sink = IndexSink::new(ToggleGate::on(), Arc::new(es));

    let err = sink.index(&record("a"), Some("a"), "alerts").await.unwrap_err();
    assert!(matches!(err, SinkError::Delivery { sink: "index", .. }));
    assert_eq!(sink.metrics().snapshot().errors, 1);
}
