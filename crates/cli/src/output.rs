//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a rounded table
pub fn print_rows<T: tabled::Tabled>(rows: Vec<T>) {
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a signed byte delta as human-readable string
pub fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let sign = if bytes < 0.0 { "-" } else { "" };
    let abs = bytes.abs();
    if abs >= GB {
        format!("{}{:.2}Gi", sign, abs / GB)
    } else if abs >= MB {
        format!("{}{:.2}Mi", sign, abs / MB)
    } else if abs >= KB {
        format!("{}{:.2}Ki", sign, abs / KB)
    } else {
        format!("{}{:.0}B", sign, abs)
    }
}

/// Format milliseconds, switching to microseconds below one millisecond
pub fn format_millis(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.1}µs", ms * 1000.0)
    } else {
        format!("{:.2}ms", ms)
    }
}

/// Format confidence as percentage
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Format an epoch-millisecond timestamp for display
pub fn format_timestamp(ms: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => ms.to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "detecting" | "yes" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        "unhealthy" | "stopped" | "no" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_confidence(confidence);
    if confidence >= 0.95 {
        formatted.red().to_string()
    } else if confidence >= 0.8 {
        formatted.yellow().to_string()
    } else {
        formatted.normal().to_string()
    }
}
