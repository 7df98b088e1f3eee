//! Index queries
//!
//! Results are printed as JSON, one document per alert. Both commands need
//! an index that outlives the process.

use anyhow::{Context, Result};
use clap::Args;
use tempest_config::Config;
use tempest_protocol::{AlertQuery, AlertRecord};

use crate::builder;

/// Search command arguments
#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub summary: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Matched against `areaDesc`
    #[arg(long)]
    pub area: Option<String>,

    #[arg(long)]
    pub severity: Option<String>,

    #[arg(long)]
    pub urgency: Option<String>,

    #[arg(long)]
    pub certainty: Option<String>,

    /// RFC 3339 instant, e.g. 2021-04-01T12:00:00Z
    #[arg(long)]
    pub effective: Option<String>,

    /// RFC 3339 instant
    #[arg(long)]
    pub expires: Option<String>,

    /// RFC 3339 instant
    #[arg(long)]
    pub updated: Option<String>,

    #[arg(long)]
    pub active: Option<bool>,

    /// Tolerate small misspellings instead of matching exactly
    #[arg(long)]
    pub fuzzy: bool,

    /// Output format: json (default), compact
    #[arg(short, long, default_value = "json")]
    pub output: String,
}

impl SearchArgs {
    fn query(&self) -> AlertQuery {
        AlertQuery {
            id: self.id.clone(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            category: self.category.clone(),
            area_desc: self.area.clone(),
            severity: self.severity.clone(),
            urgency: self.urgency.clone(),
            certainty: self.certainty.clone(),
            effective: self.effective.clone(),
            expires: self.expires.clone(),
            updated: self.updated.clone(),
            active: self.active,
        }
    }
}

/// Select command arguments
#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Maximum number of alerts (index default when omitted)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output format: json (default), compact
    #[arg(short, long, default_value = "json")]
    pub output: String,
}

/// Run the search command
pub async fn search(config: &Config, args: SearchArgs) -> Result<()> {
    let query = args.query();
    if query.is_empty() {
        anyhow::bail!("at least one field is required, e.g. --severity Severe");
    }
    require_persistent_index(config, "search")?;

    let (orchestrator, workers) = builder::build(config)?;
    let result = orchestrator.search(&query, args.fuzzy).await;
    workers.shutdown().await;

    print_records(&result.context("search failed")?, &args.output)
}

/// Run the select command
pub async fn select(config: &Config, args: SelectArgs) -> Result<()> {
    require_persistent_index(config, "select")?;
    let (orchestrator, workers) = builder::build(config)?;
    let result = orchestrator.select_all(args.limit).await;
    workers.shutdown().await;

    print_records(&result.context("select failed")?, &args.output)
}

/// A fresh in-memory index is always empty, so querying it says nothing
fn require_persistent_index(config: &Config, command: &str) -> Result<()> {
    if config.index.backend.is_in_process() {
        anyhow::bail!(
            "{command} needs a persistent index; the in-memory backend starts empty on every run \
             (set [index.backend] type = \"elasticsearch\")"
        );
    }
    Ok(())
}

fn print_records(records: &[AlertRecord], output: &str) -> Result<()> {
    for record in records {
        let line = match output {
            "compact" => serde_json::to_string(record)?,
            _ => serde_json::to_string_pretty(record)?,
        };
        println!("{line}");
    }
    tracing::debug!(count = records.len(), "printed alerts");
    Ok(())
}
