//! Threshold warning listing

use anyhow::Result;
use monitor_lib::Warning;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    format_bytes, format_millis, format_timestamp, print_json, print_rows, print_success,
    OutputFormat,
};

#[derive(Tabled)]
struct WarningRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Type")]
    warning_type: String,
    #[tabled(rename = "Context")]
    context: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&Warning> for WarningRow {
    fn from(warning: &Warning) -> Self {
        let detail = match (warning.batch_size, warning.creation_time, warning.memory_delta) {
            (Some(size), _, _) => format!("batch of {}", size),
            (None, Some(time), Some(delta)) => {
                format!("{} / {}", format_millis(time), format_bytes(delta))
            }
            (None, Some(time), None) => format_millis(time),
            (None, None, Some(delta)) => format_bytes(delta),
            (None, None, None) => "-".to_string(),
        };
        Self {
            timestamp: format_timestamp(warning.timestamp),
            warning_type: warning.warning_type.to_string(),
            context: warning.context.clone().unwrap_or_else(|| "-".to_string()),
            detail,
        }
    }
}

/// List recent threshold warnings
pub async fn list_warnings(
    client: &ApiClient,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let warnings = client.warnings(limit).await?;

    match format {
        OutputFormat::Json => print_json(&warnings)?,
        OutputFormat::Table => {
            if warnings.is_empty() {
                print_success("No recent warnings");
                return Ok(());
            }
            print_rows(warnings.iter().map(WarningRow::from).collect());
            println!("\nTotal: {} warnings", warnings.len());
        }
    }

    Ok(())
}
