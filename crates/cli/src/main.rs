//! Performance monitor CLI
//!
//! A command-line tool for inspecting a running perf-monitor agent:
//! live sampling counters, health, anomaly reports and threshold warnings.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{report, status, warnings};
use monitor_lib::AnomalyType;

/// Performance monitor CLI
#[derive(Parser)]
#[command(name = "pmctl")]
#[command(author, version, about = "CLI for the performance monitor agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via PMCTL_API_URL env var)
    #[arg(long, env = "PMCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show realtime sampling counters and health
    Status,

    /// Show the agent's health
    Health,

    /// Show the full anomaly report
    Report,

    /// List recent anomalies
    Anomalies {
        /// Maximum number of records
        #[arg(long, short)]
        limit: Option<usize>,

        /// Only show anomalies of this type
        #[arg(long = "type", short = 't')]
        anomaly_type: Option<AnomalyKind>,
    },

    /// List recent threshold warnings
    Warnings {
        /// Maximum number of records
        #[arg(long, short)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AnomalyKind {
    MemorySpike,
    MemoryLeak,
    SlowCreation,
    BatchDegradation,
}

impl From<AnomalyKind> for AnomalyType {
    fn from(kind: AnomalyKind) -> Self {
        match kind {
            AnomalyKind::MemorySpike => AnomalyType::MemorySpike,
            AnomalyKind::MemoryLeak => AnomalyType::MemoryLeak,
            AnomalyKind::SlowCreation => AnomalyType::SlowCreation,
            AnomalyKind::BatchDegradation => AnomalyType::BatchDegradation,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = config.resolve_api_url(cli.api_url);
    if cli.verbose {
        output::print_info(&format!("Using agent at {}", api_url));
    }

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Status => status::show_status(&client, cli.format).await?,
        Commands::Health => status::show_health(&client, cli.format).await?,
        Commands::Report => report::show_report(&client, cli.format).await?,
        Commands::Anomalies { limit, anomaly_type } => {
            let limit = limit.or(config.default_limit);
            report::list_anomalies(&client, limit, anomaly_type.map(Into::into), cli.format)
                .await?;
        }
        Commands::Warnings { limit } => {
            let limit = limit.or(config.default_limit);
            warnings::list_warnings(&client, limit, cli.format).await?;
        }
    }

    Ok(())
}
