//! Realtime status and health commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, format_millis, print_json, print_rows, print_info, OutputFormat};

#[derive(Tabled)]
struct ErrorTypeRow {
    #[tabled(rename = "Classification")]
    classification: String,
    #[tabled(rename = "Count")]
    count: u64,
}

/// Show the live sampling counters and health
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.status().await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            let stats = &status.realtime_stats;
            let monitoring = if status.is_monitoring { "detecting" } else { "stopped" };

            println!("{}", "Monitor Status".bold());
            println!("{}", "=".repeat(50));
            println!("Monitoring:             {}", color_status(monitoring));
            println!(
                "Health:                 {}",
                color_status(&status.health_status.to_string())
            );
            println!();
            println!("{}", "Sampling".bold());
            println!("{}", "-".repeat(50));
            println!("Units Observed:         {}", stats.total_errors_created);
            println!("Failed Operations:      {}", stats.failed_operations);
            println!("Batch Operations:       {}", stats.batch_operations);
            println!(
                "Average Creation Time:  {}",
                format_millis(stats.average_creation_time)
            );
            println!(
                "Last Creation Time:     {}",
                format_millis(stats.last_creation_time)
            );
            println!("Recent Warnings:        {}", status.recent_warnings.len());

            if !stats.error_type_counts.is_empty() {
                println!();
                let rows: Vec<ErrorTypeRow> = stats
                    .error_type_counts
                    .iter()
                    .map(|(classification, count)| ErrorTypeRow {
                        classification: classification.clone(),
                        count: *count,
                    })
                    .collect();
                print_rows(rows);
            }
        }
    }

    Ok(())
}

/// Show the agent's health endpoint
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("Instance:   {}", health.instance.cyan());
            println!("Health:     {}", color_status(&health.status.to_string()));
            println!(
                "Detecting:  {}",
                color_status(if health.is_detecting { "yes" } else { "no" })
            );
            if !health.status.is_operational() {
                print_info("Recent warnings and anomalies: pmctl warnings, pmctl anomalies");
            }
        }
    }

    Ok(())
}
