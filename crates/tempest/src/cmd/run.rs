//! One-shot runs
//!
//! Each command builds the pipeline, runs one entry point, then waits for
//! the bridge and copy trigger to drain before exiting.

use anyhow::Result;
use tempest_config::Config;
use tempest_sinks::ArchiveReceipt;

use crate::builder;

/// Fetch, publish and archive
pub async fn end_to_end(config: &Config) -> Result<()> {
    let (orchestrator, workers) = builder::build(config)?;
    let result = orchestrator.run_end_to_end().await;
    workers.shutdown().await;

    let report = result?;
    println!(
        "fetched {} alerts ({} active), published {} [{}]",
        report.records, report.active, report.publish.record_count, report.publish.status.as_str()
    );
    match &report.archive {
        Some(receipt) => print_receipt(receipt),
        None => println!("archive sink disabled, no snapshot taken"),
    }
    Ok(())
}

/// Fetch and publish
pub async fn publish(config: &Config) -> Result<()> {
    let (orchestrator, workers) = builder::build(config)?;
    let result = orchestrator.run_publish_only().await;
    workers.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

/// Fetch and archive a snapshot
pub async fn archive(config: &Config) -> Result<()> {
    let (orchestrator, workers) = builder::build(config)?;
    let result = orchestrator.run_archive_only().await;
    workers.shutdown().await;

    print_receipt(&result?);
    Ok(())
}

fn print_receipt(receipt: &ArchiveReceipt) {
    println!(
        "archived {} rows ({} bytes) to {}/{}",
        receipt.rows, receipt.bytes, receipt.bucket, receipt.key
    );
}
