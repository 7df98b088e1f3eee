//! Serve command
//!
//! Keeps the bridge and copy trigger running until SIGINT/SIGTERM. When
//! scheduling is enabled, end-to-end runs happen on a fixed delay.

use anyhow::Result;
use clap::Args;
use tempest_config::{Config, SchedulerConfig};
use tempest_pipeline::FixedDelayScheduler;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::builder;

/// Serve command arguments
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Delay between the end of one run and the start of the next (enables scheduling)
    #[arg(long)]
    pub fixed_delay_ms: Option<u64>,

    /// Delay before the first run (enables scheduling)
    #[arg(long)]
    pub initial_delay_ms: Option<u64>,
}

impl ServeArgs {
    /// Apply CLI overrides on top of the `[scheduler]` section
    fn scheduler(&self, config: &SchedulerConfig) -> SchedulerConfig {
        let mut scheduler = config.clone();
        if let Some(ms) = self.fixed_delay_ms {
            scheduler.fixed_delay_ms = ms;
            scheduler.enabled = true;
        }
        if let Some(ms) = self.initial_delay_ms {
            scheduler.initial_delay_ms = ms;
            scheduler.enabled = true;
        }
        scheduler
    }
}

/// Run until interrupted
pub async fn run(config: &Config, args: ServeArgs) -> Result<()> {
    let scheduler_config = args.scheduler(&config.scheduler);
    if scheduler_config.enabled && scheduler_config.fixed_delay_ms == 0 {
        anyhow::bail!("scheduler fixed delay must be positive");
    }

    let (orchestrator, workers) = builder::build(config)?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("shutdown signal received, stopping...");
        shutdown.cancel();
    });

    if scheduler_config.enabled {
        let scheduler = FixedDelayScheduler::from_config(&scheduler_config);
        let stats = scheduler
            .run(cancel.clone(), || {
                let orchestrator = orchestrator.clone();
                async move { orchestrator.run_end_to_end().await }
            })
            .await;
        info!(runs = stats.runs, failures = stats.failures, "scheduled runs finished");
    } else {
        info!("scheduler disabled, serving bridge and trigger only");
        cancel.cancelled().await;
    }

    workers.shutdown().await;
    info!("tempest stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_enable_scheduling() {
        let base = SchedulerConfig::default();
        assert!(!ServeArgs::default().scheduler(&base).enabled);

        let args = ServeArgs {
            fixed_delay_ms: Some(5_000),
            initial_delay_ms: None,
        };
        let scheduler = args.scheduler(&base);
        assert!(scheduler.enabled);
        assert_eq!(scheduler.fixed_delay_ms, 5_000);
        assert_eq!(scheduler.initial_delay_ms, base.initial_delay_ms);
    }
}
