//! Wires configuration into a running pipeline
//!
//! Besides the orchestrator, two background workers are started: the
//! bus-to-index bridge (only for the in-process channel bus) and the
//! dispatcher that runs the copy function on archive uploads.

use std::sync::Arc;

use anyhow::{Context, Result};
use tempest_config::Config;
use tempest_connectors::AtomFeed;
use tempest_pipeline::{IndexBridge, Orchestrator};
use tempest_sinks::{ArchivalSink, BusSink, IndexSink};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background tasks started alongside the orchestrator
pub struct Workers {
    cancel: CancellationToken,
    bridge: Option<JoinHandle<u64>>,
    trigger: JoinHandle<()>,
}

impl Workers {
    /// Stop both workers once they have drained what is queued
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Some(bridge) = self.bridge {
            match bridge.await {
                Ok(indexed) => debug!(indexed, "bridge joined"),
                Err(e) => warn!(error = %e, "bridge task failed"),
            }
        }
        if let Err(e) = self.trigger.await {
            warn!(error = %e, "trigger task failed");
        }
    }
}

/// Build the orchestrator and spawn its workers
///
/// # Errors
///
/// Returns error if the feed location is invalid or an HTTP client cannot be created
pub fn build(config: &Config) -> Result<(Arc<Orchestrator>, Workers)> {
    let feed = AtomFeed::from_config(&config.feed).context("failed to create feed source")?;
    let (bus, topic) = BusSink::from_config(&config.bus).context("failed to create bus sink")?;
    let index = Arc::new(IndexSink::from_config(&config.index).context("failed to create index sink")?);
    let (archive, dispatcher, events) = ArchivalSink::from_config(&config.archive);

    info!(
        feed = %config.feed.location,
        topic = %config.bus.topic,
        index = %config.index.name,
        sinks = ?config.enabled_sinks(),
        "pipeline configured"
    );

    let cancel = CancellationToken::new();
    let bridge = topic.map(|topic| {
        let bridge = IndexBridge::new(index.clone(), &config.index.name);
        tokio::spawn(bridge.run(topic, cancel.clone()))
    });
    let trigger = tokio::spawn(dispatcher.run(events, cancel.clone()));

    let orchestrator = Orchestrator::new(
        Arc::new(feed),
        Arc::new(bus),
        index,
        Arc::new(archive),
        &config.index.name,
    );

    Ok((
        Arc::new(orchestrator),
        Workers {
            cancel,
            bridge,
            trigger,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempest_sinks::ObjectStore;

    const FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:cap="urn:oasis:names:tc:emergency:cap:1.1">
  <entry>
    <id>https://alerts.weather.gov/cap/wwacapget.php?x=AK.2021-04-01-1234</id>
    <title>Winter Storm Warning</title>
    <cap:expires>2099-04-02T10:00:00-08:00</cap:expires>
    <cap:severity>Severe</cap:severity>
    <cap:areaDesc>Tanana Valley</cap:areaDesc>
  </entry>
</feed>"#;

    #[tokio::test]
    async fn test_shutdown_drains_workers() {
        let dir = tempfile::tempdir().unwrap();
        let feed = dir.path().join("feed.xml");
        std::fs::write(&feed, FEED).unwrap();
        let config: Config = format!("[feed]\nlocation = \"{}\"\n", feed.display())
            .parse()
            .unwrap();

        let (orchestrator, workers) = build(&config).unwrap();
        let report = orchestrator.run_end_to_end().await.unwrap();
        workers.shutdown().await;

        let receipt = report.archive.unwrap();
        let store = orchestrator.archive().store();
        assert!(store.get_object(&config.archive.sink_bucket, &receipt.key).await.is_ok());
        assert_eq!(orchestrator.select_all(None).await.unwrap().len(), 1);
    }
}
