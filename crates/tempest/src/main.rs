//! Tempest - weather alert feed fan-out
//!
//! # Usage
//!
//! ```bash
//! # Serve: bridge, copy trigger and (if enabled) scheduled runs
//! tempest
//! tempest --config configs/tempest.toml
//!
//! # One-shot runs
//! tempest run
//! tempest publish
//! tempest archive
//!
//! # Query the index
//! tempest search --severity Severe --area "Tanana Vally" --fuzzy
//! tempest select --limit 25
//!
//! # Administration
//! tempest bucket delete-all --force
//! tempest function list
//! ```

mod builder;
mod cmd;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tempest_config::{Config, LogConfig, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Tempest - weather alert feed fan-out
#[derive(Parser, Debug)]
#[command(name = "tempest")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true, env = "TEMPEST_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Log level or filter directive. Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve until interrupted (default)
    Serve(cmd::serve::ServeArgs),

    /// Fetch, publish and archive once
    Run,

    /// Fetch and publish once
    Publish,

    /// Fetch and archive a snapshot once
    Archive,

    /// Search indexed alerts
    Search(cmd::query::SearchArgs),

    /// List indexed alerts
    Select(cmd::query::SelectArgs),

    /// Archive bucket management
    Bucket(cmd::admin::BucketArgs),

    /// Copy function management
    Function(cmd::admin::FunctionArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.log, cli.log_level.as_deref())?;

    match cli.command {
        Some(Command::Serve(args)) => cmd::serve::run(&config, args).await,
        Some(Command::Run) => cmd::run::end_to_end(&config).await,
        Some(Command::Publish) => cmd::run::publish(&config).await,
        Some(Command::Archive) => cmd::run::archive(&config).await,
        Some(Command::Search(args)) => cmd::query::search(&config, args).await,
        Some(Command::Select(args)) => cmd::query::select(&config, args).await,
        Some(Command::Bucket(args)) => cmd::admin::bucket(&config, args).await,
        Some(Command::Function(args)) => cmd::admin::function(&config, args).await,
        // No subcommand = serve (default behavior)
        None => cmd::serve::run(&config, cmd::serve::ServeArgs::default()).await,
    }
}

/// Load the config file, or defaults when none is given
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Resolve the filter directive: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, log: &LogConfig) -> String {
    match cli_level {
        Some(level) if !level.trim().is_empty() => log.filter_with_level(level),
        _ => log.filter_directive(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(log: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let directive = resolve_log_level(cli_level, log);
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .init(),
    }

    Ok(())
}
