//! Run orchestration
//!
//! ```text
//! FETCH ──> PUBLISH ──> ARCHIVE ──> DONE
//!   │          │           │
//!   └──────────┴───────────┴──────> FAILED
//! ```
//!
//! The sink required by an entry point is checked before anything is
//! fetched. Nothing is retried here; each error keeps its kind.

use std::sync::Arc;
use std::time::Instant;

use tempest_connectors::FeedSource;
use tempest_protocol::{AlertQuery, AlertRecord, ProcessingResult};
use tempest_sinks::{ArchivalSink, ArchiveReceipt, BusSink, IndexSink, Togglable};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result, RunError, RunStage};

/// Outcome of an end-to-end run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Records fetched from the feed
    pub records: usize,
    /// Of those, records still active
    pub active: usize,
    pub publish: ProcessingResult,
    /// `None` when the archive sink is switched off
    pub archive: Option<ArchiveReceipt>,
}

/// Sequences feed, bus and archive for one run
pub struct Orchestrator {
    feed: Arc<dyn FeedSource>,
    bus: Arc<BusSink>,
    index: Arc<IndexSink>,
    archive: Arc<ArchivalSink>,
    index_name: String,
}

impl Orchestrator {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        bus: Arc<BusSink>,
        index: Arc<IndexSink>,
        archive: Arc<ArchivalSink>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            feed,
            bus,
            index,
            archive,
            index_name: index_name.into(),
        }
    }

    pub fn bus(&self) -> &Arc<BusSink> {
        &self.bus
    }

    pub fn index(&self) -> &Arc<IndexSink> {
        &self.index
    }

    pub fn archive(&self) -> &Arc<ArchivalSink> {
        &self.archive
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Fetch, publish every record, then archive a snapshot
    ///
    /// The bus is mandatory. A disabled archive sink is skipped.
    ///
    /// # Errors
    ///
    /// Returns the first failure together with the stage it happened in
    pub async fn run_end_to_end(&self) -> std::result::Result<RunReport, RunError> {
        let started = Instant::now();
        info!(feed = %self.feed.location(), "end-to-end run starting");

        let result = self.end_to_end().await;
        finish("end_to_end", started, result)
    }

    /// Fetch and publish only
    ///
    /// # Errors
    ///
    /// `CapabilityDisabled` if the bus is off; otherwise the fetch or publish failure
    pub async fn run_publish_only(&self) -> std::result::Result<ProcessingResult, RunError> {
        let started = Instant::now();
        let result = self.publish_only().await;
        finish("publish_only", started, result)
    }

    /// Fetch and archive only
    ///
    /// # Errors
    ///
    /// `CapabilityDisabled` if the archive is off; otherwise the fetch,
    /// provisioning or upload failure
    pub async fn run_archive_only(&self) -> std::result::Result<ArchiveReceipt, RunError> {
        let started = Instant::now();
        let result = self.archive_only().await;
        finish("archive_only", started, result)
    }

    /// Records matching every present field of `query`
    ///
    /// # Errors
    ///
    /// `CapabilityDisabled` if the index is off, `SinkDelivery` if it cannot be queried
    pub async fn search(&self, query: &AlertQuery, fuzzy: bool) -> Result<Vec<AlertRecord>> {
        self.index.require_enabled(PipelineError::capability_disabled(
            "cannot search alerts when the index sink is disabled",
        ))?;
        Ok(self.index.search(query, &self.index_name, fuzzy).await?)
    }

    /// First `limit` indexed records (10 when `None`)
    ///
    /// # Errors
    ///
    /// `CapabilityDisabled` if the index is off, `SinkDelivery` if it cannot be queried
    pub async fn select_all(&self, limit: Option<usize>) -> Result<Vec<AlertRecord>> {
        self.index.require_enabled(PipelineError::capability_disabled(
            "cannot select alerts when the index sink is disabled",
        ))?;
        Ok(self.index.select_all(&self.index_name, limit).await?)
    }

    async fn end_to_end(&self) -> std::result::Result<RunReport, RunError> {
        self.require_bus("an end-to-end run")
            .map_err(|e| RunError::new(RunStage::Publish, e))?;

        let records = self.fetch().await?;
        let publish = self.publish(&records).await?;

        let archive = if self.archive.enabled() {
            Some(self.archive_records(&records).await?)
        } else {
            info!("archive sink disabled, snapshot skipped");
            None
        };

        Ok(RunReport {
            records: records.len(),
            active: records.iter().filter(|r| r.active).count(),
            publish,
            archive,
        })
    }

    async fn publish_only(&self) -> std::result::Result<ProcessingResult, RunError> {
        self.require_bus("publishing the feed")
            .map_err(|e| RunError::new(RunStage::Publish, e))?;
        let records = self.fetch().await?;
        self.publish(&records).await
    }

    async fn archive_only(&self) -> std::result::Result<ArchiveReceipt, RunError> {
        self.archive
            .require_enabled(PipelineError::capability_disabled(
                "cannot archive the feed when the archive sink is disabled",
            ))
            .map_err(|e| RunError::new(RunStage::Archive, e))?;
        let records = self.fetch().await?;
        self.archive_records(&records).await
    }

    fn require_bus(&self, operation: &str) -> Result<()> {
        self.bus.require_enabled(PipelineError::capability_disabled(format!(
            "bus sink is required for {operation} but is disabled"
        )))
    }

    async fn fetch(&self) -> std::result::Result<Vec<AlertRecord>, RunError> {
        debug!(stage = %RunStage::Fetch, source = self.feed.name(), "entering stage");
        self.feed
            .fetch()
            .await
            .map_err(|e| RunError::new(RunStage::Fetch, e))
    }

    async fn publish(
        &self,
        records: &[AlertRecord],
    ) -> std::result::Result<ProcessingResult, RunError> {
        debug!(stage = %RunStage::Publish, topic = self.bus.topic(), "entering stage");
        self.bus
            .publish(records)
            .await
            .map_err(|e| RunError::new(RunStage::Publish, e))
    }

    async fn archive_records(
        &self,
        records: &[AlertRecord],
    ) -> std::result::Result<ArchiveReceipt, RunError> {
        debug!(stage = %RunStage::Archive, "entering stage");
        self.archive
            .snapshot_and_archive(records)
            .await
            .map_err(|e| RunError::new(RunStage::Archive, e))
    }
}

fn finish<T>(
    run: &'static str,
    started: Instant,
    result: std::result::Result<T, RunError>,
) -> std::result::Result<T, RunError> {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => info!(run, stage = %RunStage::Done, elapsed_ms, "run complete"),
        Err(e) => warn!(
            run,
            stage = %RunStage::Failed,
            failed_during = %e.stage,
            kind = e.error.kind(),
            error = %e.error,
            elapsed_ms,
            "run failed"
        ),
    }
    result
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod orchestrator_test;
