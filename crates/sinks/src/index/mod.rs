//! Index sink - stores alert records for exact and fuzzy lookup
//!
//! Writes are keyed by id and replace any existing document. Reads are a
//! single page: `select_all` returns at most `limit` documents, `search`
//! ANDs one clause per constrained query field.

mod elasticsearch;
mod fuzzy;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tempest_config::{IndexBackend, IndexConfig};
use tempest_protocol::{AlertQuery, AlertRecord};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::common::{SinkError, SinkMetrics};
use crate::toggle::{Togglable, ToggleGate};

pub use elasticsearch::{ElasticsearchBackend, build_search_body, parse_hits};
pub use fuzzy::{auto_fuzziness, levenshtein};
pub use memory::MemoryIndex;

/// Sink name used in errors and logs
pub const INDEX: &str = "index";

/// Page size when the caller gives none
pub const DEFAULT_LIMIT: usize = 10;

/// Index name used when none is configured
pub const FALLBACK_INDEX_NAME: &str = "alertrecord";

/// How query clauses compare against stored values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Whole value equals the query value
    Exact,
    /// Some token of the value is within the AUTO edit distance of the query value
    Fuzzy,
}

impl MatchMode {
    pub fn from_fuzzy(fuzzy: bool) -> Self {
        if fuzzy { Self::Fuzzy } else { Self::Exact }
    }
}

/// Storage and query engine behind the index sink
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or replace the document under `id`
    async fn put(&self, index: &str, id: &str, record: &AlertRecord) -> Result<(), SinkError>;

    /// First `limit` documents
    async fn select(&self, index: &str, limit: usize) -> Result<Vec<AlertRecord>, SinkError>;

    /// First `limit` documents matching every clause of `query`
    async fn search(
        &self,
        index: &str,
        query: &AlertQuery,
        mode: MatchMode,
        limit: usize,
    ) -> Result<Vec<AlertRecord>, SinkError>;
}

/// Empty names fall back to the record type name
pub fn resolve_index_name(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        FALLBACK_INDEX_NAME
    } else {
        trimmed
    }
}

/// Toggle-gated search index
pub struct IndexSink {
    gate: ToggleGate,
    backend: Arc<dyn SearchBackend>,
    default_limit: usize,
    metrics: SinkMetrics,
}

impl IndexSink {
    pub fn new(gate: ToggleGate, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            gate,
            backend,
            default_limit: DEFAULT_LIMIT,
            metrics: SinkMetrics::new(),
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Build from the `[index]` section
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn from_config(config: &IndexConfig) -> Result<Self, SinkError> {
        let backend: Arc<dyn SearchBackend> = match &config.backend {
            IndexBackend::Memory => Arc::new(MemoryIndex::new()),
            IndexBackend::Elasticsearch { url, timeout } => {
                Arc::new(ElasticsearchBackend::new(url, *timeout)?)
            }
        };
        Ok(Self::new(ToggleGate::new(config.enabled), backend).with_default_limit(config.default_limit))
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Index one record
    ///
    /// Uses `explicit_id` when given, otherwise a fresh random id. Returns
    /// `None` without touching the backend when the sink is disabled.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Delivery` if the backend rejects the write
    pub async fn index(
        &self,
        record: &AlertRecord,
        explicit_id: Option<&str>,
        index_name: &str,
    ) -> Result<Option<String>, SinkError> {
        if !self.enabled() {
            self.metrics.skip();
            return Ok(None);
        }

        let id = match explicit_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let index = resolve_index_name(index_name);

        self.metrics.received(1);
        if let Err(e) = self.backend.put(index, &id, record).await {
            self.metrics.error();
            warn!(index = %index, id = %id, error = %e, "index write failed");
            return Err(e);
        }
        self.metrics.delivered(1, 0);
        debug!(index = %index, id = %id, "indexed alert");
        Ok(Some(id))
    }

    /// Up to `limit` records (default 10), single page
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Disabled` when the sink is off, or
    /// `SinkError::Delivery` if the backend cannot be queried
    pub async fn select_all(
        &self,
        index_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AlertRecord>, SinkError> {
        self.require_enabled(SinkError::disabled(INDEX))?;
        let limit = limit.unwrap_or(self.default_limit);
        let index = resolve_index_name(index_name);
        self.backend.select(index, limit).await
    }

    /// Records matching every present field of `query`
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Disabled` when the sink is off, or
    /// `SinkError::Delivery` if the backend cannot be queried
    pub async fn search(
        &self,
        query: &AlertQuery,
        index_name: &str,
        fuzzy: bool,
    ) -> Result<Vec<AlertRecord>, SinkError> {
        self.require_enabled(SinkError::disabled(INDEX))?;
        let index = resolve_index_name(index_name);
        let mode = MatchMode::from_fuzzy(fuzzy);
        debug!(
            index = %index,
            mode = ?mode,
            clauses = query.clauses().len(),
            backend = self.backend.name(),
            "searching alerts"
        );
        self.backend
            .search(index, query, mode, self.default_limit)
            .await
    }
}

impl Togglable for IndexSink {
    fn enabled(&self) -> bool {
        self.gate.enabled()
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
