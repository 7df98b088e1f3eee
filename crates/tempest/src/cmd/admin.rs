//! Bucket and function administration
//!
//! Every command needs storage that outlives the process.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tempest_config::Config;
use tempest_sinks::ArchivalSink;

/// Bucket command arguments
#[derive(Args, Debug)]
pub struct BucketArgs {
    #[command(subcommand)]
    pub command: BucketCommand,
}

#[derive(Subcommand, Debug)]
pub enum BucketCommand {
    /// List buckets
    List,

    /// Delete one bucket
    Delete {
        name: String,

        /// Delete every object first
        #[arg(long)]
        force: bool,
    },

    /// Delete every bucket, stopping at the first failure
    DeleteAll {
        /// Delete every object first
        #[arg(long)]
        force: bool,
    },
}

/// Function command arguments
#[derive(Args, Debug)]
pub struct FunctionArgs {
    #[command(subcommand)]
    pub command: FunctionCommand,
}

#[derive(Subcommand, Debug)]
pub enum FunctionCommand {
    /// List functions
    List,

    /// Delete one function
    Delete { name: String },

    /// Create or update the configured copy function and wire its trigger
    Provision,
}

/// Run a bucket command
pub async fn bucket(config: &Config, args: BucketArgs) -> Result<()> {
    require_persistent_storage(config, "bucket")?;
    let (archive, _dispatcher, _events) = ArchivalSink::from_config(&config.archive);

    match args.command {
        BucketCommand::List => {
            for name in archive.list_buckets().await.context("failed to list buckets")? {
                println!("{name}");
            }
        }
        BucketCommand::Delete { name, force } => {
            if force {
                let removed = archive
                    .force_delete_bucket(&name)
                    .await
                    .with_context(|| format!("failed to force-delete bucket {name}"))?;
                println!("deleted {name} ({removed} objects)");
            } else {
                archive
                    .delete_bucket(&name)
                    .await
                    .with_context(|| format!("failed to delete bucket {name}"))?;
                println!("deleted {name}");
            }
        }
        BucketCommand::DeleteAll { force } => {
            let deleted = archive
                .delete_all_buckets(force)
                .await
                .context("failed to delete buckets")?;
            for name in &deleted {
                println!("deleted {name}");
            }
        }
    }
    Ok(())
}

/// Run a function command
pub async fn function(config: &Config, args: FunctionArgs) -> Result<()> {
    require_persistent_storage(config, "function")?;
    let (archive, _dispatcher, _events) = ArchivalSink::from_config(&config.archive);

    match args.command {
        FunctionCommand::List => {
            for function in archive.list_functions().await.context("failed to list functions")? {
                println!(
                    "{}\t{}\ttimeout={}s",
                    function.name, function.handler, function.timeout_secs
                );
            }
        }
        FunctionCommand::Delete { name } => {
            let deleted = archive
                .delete_function(&name)
                .await
                .with_context(|| format!("failed to delete function {name}"))?;
            if deleted {
                println!("deleted {name}");
            } else {
                anyhow::bail!("function {name} does not exist");
            }
        }
        FunctionCommand::Provision => {
            let provisioned = archive.provision().await.context("provisioning failed")?;
            println!(
                "function {} {:?}; source bucket created: {}; sink bucket created: {}",
                archive.settings().descriptor.name,
                provisioned.function,
                provisioned.source_created,
                provisioned.sink_created
            );
        }
    }
    Ok(())
}

/// In-memory buckets and functions vanish on exit, so administering them is a no-op
fn require_persistent_storage(config: &Config, command: &str) -> Result<()> {
    if config.archive.storage.is_in_process() {
        anyhow::bail!(
            "{command} commands need persistent storage; the in-memory backend starts empty on every run \
             (set [archive.storage] type = \"filesystem\")"
        );
    }
    Ok(())
}
