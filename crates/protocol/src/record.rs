//! Alert record and its static schema
//!
//! An `AlertRecord` is built once from a feed entry and never mutated
//! afterwards. Column order for tabular output comes from `RecordField::ALL`.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// One column of the alert record schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Id,
    Title,
    Summary,
    Category,
    AreaDesc,
    Severity,
    Urgency,
    Certainty,
    Effective,
    Expires,
    Updated,
    Active,
}

impl RecordField {
    /// Every column in output order
    pub const ALL: [RecordField; 12] = [
        Self::Id,
        Self::Title,
        Self::Summary,
        Self::Category,
        Self::AreaDesc,
        Self::Severity,
        Self::Urgency,
        Self::Certainty,
        Self::Effective,
        Self::Expires,
        Self::Updated,
        Self::Active,
    ];

    /// Column name as it appears in snapshots, JSON documents and feed tags
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Summary => "summary",
            Self::Category => "category",
            Self::AreaDesc => "areaDesc",
            Self::Severity => "severity",
            Self::Urgency => "urgency",
            Self::Certainty => "certainty",
            Self::Effective => "effective",
            Self::Expires => "expires",
            Self::Updated => "updated",
            Self::Active => "active",
        }
    }

    /// Look up a column by name (exact match)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Whether values of this column are timestamps
    pub const fn is_timestamp(self) -> bool {
        matches!(self, Self::Effective | Self::Expires | Self::Updated)
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized alert
///
/// Invariant: `active == expires.is_some_and(|e| e > created_at)`, where
/// `created_at` is the instant passed to [`AlertRecordBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "areaDesc")]
    pub area_desc: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub certainty: Option<String>,
    #[serde(default)]
    pub effective: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    pub active: bool,
}

impl AlertRecord {
    /// Text value of a column, `None` when the field is absent
    pub fn value(&self, field: RecordField) -> Option<String> {
        match field {
            RecordField::Id => Some(self.id.clone()),
            RecordField::Title => Some(self.title.clone()),
            RecordField::Summary => self.summary.clone(),
            RecordField::Category => self.category.clone(),
            RecordField::AreaDesc => self.area_desc.clone(),
            RecordField::Severity => self.severity.clone(),
            RecordField::Urgency => self.urgency.clone(),
            RecordField::Certainty => self.certainty.clone(),
            RecordField::Effective => self.effective.map(format_timestamp),
            RecordField::Expires => self.expires.map(format_timestamp),
            RecordField::Updated => self.updated.map(format_timestamp),
            RecordField::Active => Some(self.active.to_string()),
        }
    }

    /// Instant held by a timestamp column, `None` for other columns
    pub fn timestamp(&self, field: RecordField) -> Option<DateTime<Utc>> {
        match field {
            RecordField::Effective => self.effective,
            RecordField::Expires => self.expires,
            RecordField::Updated => self.updated,
            _ => None,
        }
    }

    /// One row of column values in `RecordField::ALL` order, absent fields empty
    pub fn row(&self) -> Vec<String> {
        RecordField::ALL
            .iter()
            .map(|f| self.value(*f).unwrap_or_default())
            .collect()
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `true` only when an expiry exists and lies strictly after `now`
#[inline]
pub fn compute_active(expires: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires.is_some_and(|e| e > now)
}

/// Record id derived from an entry URI: the text after the last `.`
///
/// A URI without any `.` is returned whole.
pub fn id_from_uri(uri: &str) -> &str {
    let uri = uri.trim();
    uri.rsplit_once('.').map_or(uri, |(_, tail)| tail)
}

/// Accumulates raw entry values while a feed entry is being read
#[derive(Debug, Default, Clone)]
pub struct AlertRecordBuilder {
    uri: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    updated: Option<String>,
    category: Option<String>,
    area_desc: Option<String>,
    severity: Option<String>,
    urgency: Option<String>,
    certainty: Option<String>,
    effective: Option<String>,
    expires: Option<String>,
}

impl AlertRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uri(&mut self, value: impl Into<String>) -> &mut Self {
        self.uri = Some(value.into());
        self
    }

    pub fn title(&mut self, value: impl Into<String>) -> &mut Self {
        self.title = Some(value.into());
        self
    }

    pub fn summary(&mut self, value: impl Into<String>) -> &mut Self {
        self.summary = Some(value.into());
        self
    }

    pub fn updated(&mut self, value: impl Into<String>) -> &mut Self {
        self.updated = Some(value.into());
        self
    }

    /// Set an extension (CAP) value by tag name
    ///
    /// Returns `false` when the tag has no column in the record schema; the
    /// value is dropped in that case.
    pub fn extension(&mut self, tag: &str, value: impl Into<String>) -> bool {
        let slot = match RecordField::from_name(tag) {
            Some(RecordField::Category) => &mut self.category,
            Some(RecordField::AreaDesc) => &mut self.area_desc,
            Some(RecordField::Severity) => &mut self.severity,
            Some(RecordField::Urgency) => &mut self.urgency,
            Some(RecordField::Certainty) => &mut self.certainty,
            Some(RecordField::Effective) => &mut self.effective,
            Some(RecordField::Expires) => &mut self.expires,
            _ => return false,
        };
        *slot = Some(value.into());
        true
    }

    /// Finish the record, computing `active` against `now`
    ///
    /// # Errors
    ///
    /// Returns error if the entry has no URI or a timestamp is malformed.
    pub fn build(self, now: DateTime<Utc>) -> Result<AlertRecord, ProtocolError> {
        let uri = self
            .uri
            .filter(|u| !u.trim().is_empty())
            .ok_or(ProtocolError::MissingField("id"))?;

        let effective = parse_timestamp(RecordField::Effective, self.effective)?;
        let expires = parse_timestamp(RecordField::Expires, self.expires)?;
        let updated = parse_timestamp(RecordField::Updated, self.updated)?;

        Ok(AlertRecord {
            id: id_from_uri(&uri).to_string(),
            title: self.title.unwrap_or_default(),
            summary: non_empty(self.summary),
            category: non_empty(self.category),
            area_desc: non_empty(self.area_desc),
            severity: non_empty(self.severity),
            urgency: non_empty(self.urgency),
            certainty: non_empty(self.certainty),
            effective,
            expires,
            updated,
            active: compute_active(expires, now),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_timestamp(
    field: RecordField,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, ProtocolError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|_| ProtocolError::invalid_timestamp(field.as_str(), trimmed))
}
