//! Tests for Atom parsing

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use tempest_protocol::DEFAULT_CAP_FIELDS;

use crate::atom::{FeedLocation, parse_feed};
use crate::error::FeedError;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 4, 1, 12, 0, 0).unwrap()
}

fn cap_fields() -> HashSet<String> {
    DEFAULT_CAP_FIELDS.iter().map(|s| s.to_string()).collect()
}

fn feed(entries: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:cap="urn:oasis:names:tc:emergency:cap:1.1">
  <title>Alerts</title>
  {entries}
</feed>"#
    )
}

// =============================================================================
// FeedLocation tests
// =============================================================================

#[test]
fn test_location_classification() {
    assert_eq!(
        FeedLocation::parse("https://alerts.example.gov/cap/us.php?x=0"),
        FeedLocation::Url("https://alerts.example.gov/cap/us.php?x=0".into())
    );
    assert_eq!(
        FeedLocation::parse(" http://localhost:8080/feed "),
        FeedLocation::Url("http://localhost:8080/feed".into())
    );
    assert_eq!(
        FeedLocation::parse("fixtures/alerts.xml"),
        FeedLocation::File("fixtures/alerts.xml".into())
    );
}

// =============================================================================
// Entry mapping tests
// =============================================================================

#[test]
fn test_single_entry_mapping() {
    let xml = feed(
        r#"<entry>
    <id>https://alerts.example.gov/cap/warnings.2021-04-01-1234</id>
    <updated>2021-04-01T07:10:00-08:00</updated>
    <title>Flood Warning</title>
    <summary>River rising</summary>
    <cap:effective>2021-04-01T07:10:00-08:00</cap:effective>
    <cap:expires>2021-04-02T07:00:00-08:00</cap:expires>
    <cap:category>Met</cap:category>
    <cap:urgency>Expected</cap:urgency>
    <cap:severity>Severe</cap:severity>
    <cap:certainty>Likely</cap:certainty>
    <cap:areaDesc>Tanana Valley</cap:areaDesc>
  </entry>"#,
    );

    let records = parse_feed(&xml, &cap_fields(), now()).unwrap();
    assert_eq!(records.len(), 1);

    let r = &records[0];
    assert_eq!(r.id, "2021-04-01-1234");
    assert_eq!(r.title, "Flood Warning");
    assert_eq!(r.summary.as_deref(), Some("River rising"));
    assert_eq!(r.category.as_deref(), Some("Met"));
    assert_eq!(r.urgency.as_deref(), Some("Expected"));
    assert_eq!(r.severity.as_deref(), Some("Severe"));
    assert_eq!(r.certainty.as_deref(), Some("Likely"));
    assert_eq!(r.area_desc.as_deref(), Some("Tanana Valley"));
    assert_eq!(
        r.expires,
        Some(Utc.with_ymd_and_hms(2021, 4, 2, 15, 0, 0).unwrap())
    );
    assert_eq!(
        r.updated,
        Some(Utc.with_ymd_and_hms(2021, 4, 1, 15, 10, 0).unwrap())
    );
    assert!(r.active);
}

#[test]
fn test_allow_list_filters_extensions() {
    let xml = feed(
        r#"<entry>
    <id>a.1</id>
    <title>t</title>
    <cap:severity>Severe</cap:severity>
    <cap:urgency>Immediate</cap:urgency>
  </entry>"#,
    );
    let allowed: HashSet<String> = ["severity".to_string()].into();

    let records = parse_feed(&xml, &allowed, now()).unwrap();
    assert_eq!(records[0].severity.as_deref(), Some("Severe"));
    assert_eq!(records[0].urgency, None);
}

#[test]
fn test_not_allow_listed_expiry_is_inactive() {
    let xml = feed(
        r#"<entry>
    <id>a.1</id>
    <cap:expires>2099-01-01T00:00:00Z</cap:expires>
  </entry>"#,
    );
    let allowed: HashSet<String> = ["severity".to_string()].into();

    let records = parse_feed(&xml, &allowed, now()).unwrap();
    assert_eq!(records[0].expires, None);
    assert!(!records[0].active);
}

#[test]
fn test_unmapped_allow_listed_tag_is_dropped() {
    let xml = feed(
        r#"<entry>
    <id>a.1</id>
    <cap:msgType>Alert</cap:msgType>
  </entry>"#,
    );
    let mut allowed = cap_fields();
    allowed.insert("msgType".into());

    let records = parse_feed(&xml, &allowed, now()).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_nested_children_ignored() {
    let xml = feed(
        r#"<entry>
    <id>a.9</id>
    <author><name>someone</name><title>nested</title></author>
    <title>Top</title>
    <cap:geocode><valueName>FIPS6</valueName><value>002090</value></cap:geocode>
  </entry>"#,
    );
    let records = parse_feed(&xml, &cap_fields(), now()).unwrap();
    assert_eq!(records[0].title, "Top");
}

#[test]
fn test_entities_and_cdata() {
    let xml = feed(
        r#"<entry>
    <id>a.2</id>
    <title>Los Angeles &amp; Oxnard</title>
    <summary><![CDATA[gusts <50> mph]]></summary>
  </entry>"#,
    );
    let records = parse_feed(&xml, &cap_fields(), now()).unwrap();
    assert_eq!(records[0].title, "Los Angeles & Oxnard");
    assert_eq!(records[0].summary.as_deref(), Some("gusts <50> mph"));
}

#[test]
fn test_text_around_inline_child_keeps_word_boundary() {
    let xml = feed(
        r#"<entry>
    <id>a.3</id>
    <title>Flood <b>Watch</b> for Hays</title>
    <summary>a <b>x</b> c</summary>
    <cap:areaDesc>Gusts <![CDATA[<50>]]> mph</cap:areaDesc>
  </entry>"#,
    );
    let records = parse_feed(&xml, &cap_fields(), now()).unwrap();
    assert_eq!(records[0].title, "Flood for Hays");
    assert_eq!(records[0].summary.as_deref(), Some("a c"));
    assert_eq!(records[0].area_desc.as_deref(), Some("Gusts <50> mph"));
}

#[test]
fn test_surrounding_whitespace_trimmed() {
    let xml = feed(
        "<entry>\n    <id>\n      a.4\n    </id>\n    <title>  Wind   Advisory  </title>\n  </entry>",
    );
    let records = parse_feed(&xml, &cap_fields(), now()).unwrap();
    assert_eq!(records[0].id, "4");
    assert_eq!(records[0].title, "Wind   Advisory");
}

#[test]
fn test_preserves_feed_order() {
    let xml = feed(
        r#"<entry><id>x.3</id></entry>
  <entry><id>x.1</id></entry>
  <entry><id>x.2</id></entry>"#,
    );
    let ids: Vec<_> = parse_feed(&xml, &cap_fields(), now())
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["3", "1", "2"]);
}

#[test]
fn test_feed_without_entries() {
    let records = parse_feed(&feed(""), &cap_fields(), now()).unwrap();
    assert!(records.is_empty());

    let records = parse_feed("<feed/>", &cap_fields(), now()).unwrap();
    assert!(records.is_empty());
}

// =============================================================================
// Parse failure tests
// =============================================================================

#[test]
fn test_wrong_root_is_parse_error() {
    let err = parse_feed("<rss><channel/></rss>", &cap_fields(), now()).unwrap_err();
    assert!(matches!(err, FeedError::Parse(ref m) if m.contains("<rss>")));
}

#[test]
fn test_plain_text_is_parse_error() {
    let err = parse_feed("not a feed at all", &cap_fields(), now()).unwrap_err();
    assert!(matches!(err, FeedError::Parse(_)));

    let err = parse_feed("", &cap_fields(), now()).unwrap_err();
    assert!(matches!(err, FeedError::Parse(_)));
}

#[test]
fn test_mismatched_tags_is_parse_error() {
    let err = parse_feed("<feed><entry><id>a.1</entry></feed>", &cap_fields(), now()).unwrap_err();
    assert!(matches!(err, FeedError::Parse(ref m) if m.contains("malformed")));
}

#[test]
fn test_entry_without_id_is_parse_error() {
    let xml = feed("<entry><title>orphan</title></entry>");
    let err = parse_feed(&xml, &cap_fields(), now()).unwrap_err();
    assert!(matches!(err, FeedError::Parse(ref m) if m.contains("id")));
}

#[test]
fn test_bad_timestamp_is_parse_error() {
    let xml = feed("<entry><id>a.1</id><cap:expires>next tuesday</cap:expires></entry>");
    let err = parse_feed(&xml, &cap_fields(), now()).unwrap_err();
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("next tuesday"));
}
