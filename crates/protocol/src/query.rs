//! Partial alert record used as a search query

use serde::{Deserialize, Serialize};

use crate::record::RecordField;

/// Query-by-example over alert records
///
/// Every present, non-empty field becomes one clause; clauses are combined
/// with AND. Absent fields match anything. Timestamps are RFC 3339 text and
/// match by instant; `active` matches exactly in both modes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertQuery {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "areaDesc")]
    pub area_desc: Option<String>,
    pub severity: Option<String>,
    pub urgency: Option<String>,
    pub certainty: Option<String>,
    pub effective: Option<String>,
    pub expires: Option<String>,
    pub updated: Option<String>,
    pub active: Option<bool>,
}

impl AlertQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_severity(mut self, value: impl Into<String>) -> Self {
        self.severity = Some(value.into());
        self
    }

    pub fn with_urgency(mut self, value: impl Into<String>) -> Self {
        self.urgency = Some(value.into());
        self
    }

    pub fn with_certainty(mut self, value: impl Into<String>) -> Self {
        self.certainty = Some(value.into());
        self
    }

    pub fn with_category(mut self, value: impl Into<String>) -> Self {
        self.category = Some(value.into());
        self
    }

    pub fn with_area(mut self, value: impl Into<String>) -> Self {
        self.area_desc = Some(value.into());
        self
    }

    pub fn with_title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    pub fn with_summary(mut self, value: impl Into<String>) -> Self {
        self.summary = Some(value.into());
        self
    }

    pub fn with_expires(mut self, value: impl Into<String>) -> Self {
        self.expires = Some(value.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// (column, value) pairs for every constrained field, in schema order
    pub fn clauses(&self) -> Vec<(RecordField, &str)> {
        let active = self.active.map(|a| if a { "true" } else { "false" });
        [
            (RecordField::Id, self.id.as_deref()),
            (RecordField::Title, self.title.as_deref()),
            (RecordField::Summary, self.summary.as_deref()),
            (RecordField::Category, self.category.as_deref()),
            (RecordField::AreaDesc, self.area_desc.as_deref()),
            (RecordField::Severity, self.severity.as_deref()),
            (RecordField::Urgency, self.urgency.as_deref()),
            (RecordField::Certainty, self.certainty.as_deref()),
            (RecordField::Effective, self.effective.as_deref()),
            (RecordField::Expires, self.expires.as_deref()),
            (RecordField::Updated, self.updated.as_deref()),
            (RecordField::Active, active),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (field, v))
        })
        .collect()
    }

    /// True when no field is constrained
    pub fn is_empty(&self) -> bool {
        self.clauses().is_empty()
    }
}
