//! Record fixtures shared by sink tests

use chrono::{Duration, Utc};
use tempest_protocol::AlertRecord;

pub fn record(id: &str) -> AlertRecord {
    AlertRecord {
        id: id.to_string(),
        title: format!("Alert {id}"),
        summary: None,
        category: Some("Met".into()),
        area_desc: Some("Coastal Areas".into()),
        severity: Some("Moderate".into()),
        urgency: Some("Expected".into()),
        certainty: Some("Likely".into()),
        effective: None,
        expires: Some(Utc::now() + Duration::hours(6)),
        updated: None,
        active: true,
    }
}

pub fn record_with(id: &str, severity: &str, area: &str) -> AlertRecord {
    AlertRecord {
        severity: Some(severity.into()),
        area_desc: Some(area.into()),
        ..record(id)
    }
}

pub fn records(n: usize) -> Vec<AlertRecord> {
    (0..n).map(|i| record(&format!("2021-04-01-{i:04}"))).collect()
}
