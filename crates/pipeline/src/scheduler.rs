//! Fixed-delay scheduling of end-to-end runs
//!
//! The next run is scheduled only after the previous one has finished,
//! successfully or not, so runs never overlap.

use std::future::Future;
use std::time::Duration;

use tempest_config::SchedulerConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RunError;

/// Runs a job after an initial delay, then `fixed_delay` after each completion
#[derive(Debug, Clone)]
pub struct FixedDelayScheduler {
    initial_delay: Duration,
    fixed_delay: Duration,
}

/// Counters from a finished scheduler loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub runs: u64,
    pub failures: u64,
}

impl FixedDelayScheduler {
    pub fn new(initial_delay: Duration, fixed_delay: Duration) -> Self {
        Self {
            initial_delay,
            fixed_delay,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.initial_delay(), config.fixed_delay())
    }

    /// Loop until `cancel` fires
    ///
    /// A run in progress is allowed to finish; cancellation is observed
    /// while waiting between runs.
    pub async fn run<F, Fut, T>(&self, cancel: CancellationToken, mut job: F) -> SchedulerStats
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RunError>>,
    {
        info!(
            initial_delay_ms = self.initial_delay.as_millis() as u64,
            fixed_delay_ms = self.fixed_delay.as_millis() as u64,
            "scheduler started"
        );

        let mut stats = SchedulerStats::default();
        let mut delay = self.initial_delay;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            stats.runs += 1;
            match job().await {
                Ok(_) => debug!(run = stats.runs, "scheduled run finished"),
                Err(e) => {
                    stats.failures += 1;
                    warn!(
                        run = stats.runs,
                        stage = %e.stage,
                        retryable = e.error.is_retryable(),
                        error = %e.error,
                        "scheduled run failed"
                    );
                }
            }
            delay = self.fixed_delay;
        }

        info!(runs = stats.runs, failures = stats.failures, "scheduler stopped");
        stats
    }
}
