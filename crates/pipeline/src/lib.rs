//! Tempest - Pipeline
//!
//! Sequences the feed source and sinks for one run, and hosts the pieces
//! that run alongside it.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──> BusSink ──> topic ──> IndexBridge ──> IndexSink
//! FeedSource ──> Orchestrator
//!                    └──> ArchivalSink ──> source bucket ──> copy trigger ──> sink bucket
//! ```
//!
//! - **Orchestrator**: end-to-end, publish-only and archive-only runs plus index queries
//! - **IndexBridge**: consumes the topic and indexes each record under its id
//! - **FixedDelayScheduler**: repeats end-to-end runs without overlap
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(feed, bus, index, archive, "weather-alerts");
//! let report = orchestrator.run_end_to_end().await?;
//! println!("published {}", report.publish.record_count);
//! ```

mod bridge;
mod error;
mod orchestrator;
mod scheduler;

pub use bridge::IndexBridge;
pub use error::{PipelineError, Result, RunError, RunStage};
pub use orchestrator::{Orchestrator, RunReport};
pub use scheduler::{FixedDelayScheduler, SchedulerStats};
