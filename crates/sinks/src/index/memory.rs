//! In-process search index
//!
//! Documents keep their first insertion position; replacing a document
//! updates it in place.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tempest_protocol::{AlertQuery, AlertRecord, RecordField};

use super::fuzzy::fuzzy_matches;
use super::{MatchMode, SearchBackend};
use crate::common::SinkError;

#[derive(Debug, Default)]
struct Documents {
    order: Vec<String>,
    by_id: HashMap<String, AlertRecord>,
}

impl Documents {
    fn iter(&self) -> impl Iterator<Item = &AlertRecord> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

/// Index held in memory, one document set per index name
#[derive(Debug, Default)]
pub struct MemoryIndex {
    indices: RwLock<HashMap<String, Documents>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `index`
    pub fn len(&self, index: &str) -> usize {
        self.indices.read().get(index).map_or(0, |d| d.order.len())
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    /// Document stored under `id`
    pub fn get(&self, index: &str, id: &str) -> Option<AlertRecord> {
        self.indices
            .read()
            .get(index)
            .and_then(|d| d.by_id.get(id).cloned())
    }
}

fn matches(record: &AlertRecord, query: &AlertQuery, mode: MatchMode) -> bool {
    query.clauses().into_iter().all(|(field, wanted)| {
        if field.is_timestamp() {
            return same_instant(record.timestamp(field), wanted);
        }
        let Some(value) = record.value(field) else {
            return false;
        };
        match mode {
            MatchMode::Fuzzy if field != RecordField::Active => fuzzy_matches(&value, wanted),
            _ => value == wanted,
        }
    })
}

/// Unparseable query timestamps match nothing
fn same_instant(value: Option<DateTime<Utc>>, wanted: &str) -> bool {
    match (value, DateTime::parse_from_rfc3339(wanted)) {
        (Some(value), Ok(wanted)) => value == wanted,
        _ => false,
    }
}

#[async_trait]
impl SearchBackend for MemoryIndex {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, index: &str, id: &str, record: &AlertRecord) -> Result<(), SinkError> {
        let mut indices = self.indices.write();
        let docs = indices.entry(index.to_string()).or_default();
        if docs.by_id.insert(id.to_string(), record.clone()).is_none() {
            docs.order.push(id.to_string());
        }
        Ok(())
    }

    async fn select(&self, index: &str, limit: usize) -> Result<Vec<AlertRecord>, SinkError> {
        Ok(self
            .indices
            .read()
            .get(index)
            .map(|d| d.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn search(
        &self,
        index: &str,
        query: &AlertQuery,
        mode: MatchMode,
        limit: usize,
    ) -> Result<Vec<AlertRecord>, SinkError> {
        Ok(self
            .indices
            .read()
            .get(index)
            .map(|d| {
                d.iter()
                    .filter(|r| matches(r, query, mode))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
