//! Anomaly report and anomaly listing commands

use anyhow::Result;
use colored::Colorize;
use monitor_lib::{AnomalyRecord, AnomalyType};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_confidence, color_status, format_timestamp, print_json, print_rows, print_success,
    print_warning, OutputFormat,
};

/// Row for the anomalies table
#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Type")]
    anomaly_type: String,
    #[tabled(rename = "Algorithm")]
    algorithm: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Baseline")]
    baseline: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Response")]
    response: String,
}

impl From<&AnomalyRecord> for AnomalyRow {
    fn from(record: &AnomalyRecord) -> Self {
        let response = match &record.auto_response {
            Some(r) if r.applied => r.actions.join("; "),
            Some(_) => "at floor".to_string(),
            None => "-".to_string(),
        };
        Self {
            timestamp: format_timestamp(record.timestamp),
            anomaly_type: record.anomaly_type.to_string(),
            algorithm: record.algorithm.to_string(),
            value: format!("{:.3}", record.metric_value),
            baseline: format!("{:.3}", record.baseline),
            confidence: color_confidence(record.confidence),
            response,
        }
    }
}

#[derive(Tabled)]
struct BaselineRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std Dev")]
    std_dev: String,
    #[tabled(rename = "Slope/s")]
    slope: String,
    #[tabled(rename = "R²")]
    r_squared: String,
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string())
}

/// Show the full anomaly report
pub async fn show_report(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.report().await?;

    if format == OutputFormat::Json {
        return print_json(&report);
    }

    let detection = &report.detection_status;
    let stats = &report.statistics;

    println!("{}", "Anomaly Report".bold());
    println!("{}", "=".repeat(60));
    println!("Generated:            {}", format_timestamp(report.generated_at));
    println!(
        "Detecting:            {}",
        color_status(if detection.is_detecting { "yes" } else { "no" })
    );
    println!("Sensitivity:          {}", detection.sensitivity_level);
    println!("Confidence Threshold: {:.2}", detection.confidence_threshold);
    println!("Auto Response:        {}", detection.auto_response);
    println!();
    println!("{}", "Statistics".bold());
    println!("{}", "-".repeat(60));
    println!("Total Anomalies:      {}", stats.total_anomalies);
    for anomaly_type in AnomalyType::ALL {
        let count = stats.counts_by_type.get(&anomaly_type).copied().unwrap_or(0);
        println!("  {:<20}{}", anomaly_type.to_string(), count);
    }
    println!("Suppressed:           {}", stats.suppressed);
    println!("Auto Responses:       {}", stats.auto_responses);
    println!(
        "Window:               {}/{} samples",
        stats.samples_in_window, stats.window_size
    );

    if !stats.baselines.is_empty() {
        println!();
        let rows: Vec<BaselineRow> = stats
            .baselines
            .iter()
            .map(|(metric, summary)| BaselineRow {
                metric: metric.to_string(),
                mean: format!("{:.4}", summary.mean),
                std_dev: format!("{:.4}", summary.std_dev),
                slope: optional(summary.slope),
                r_squared: optional(summary.r_squared),
            })
            .collect();
        print_rows(rows);
    }

    println!();
    if report.recent_anomalies.is_empty() {
        print_success("No recent anomalies");
    } else {
        println!("{}", "Recent Anomalies".bold());
        print_rows(report.recent_anomalies.iter().map(AnomalyRow::from).collect());
    }

    Ok(())
}

/// List recent anomalies, optionally filtered by type
pub async fn list_anomalies(
    client: &ApiClient,
    limit: Option<usize>,
    anomaly_type: Option<AnomalyType>,
    format: OutputFormat,
) -> Result<()> {
    // The server limit counts every type, so filter on the full list
    let records = match anomaly_type {
        Some(_) => select_anomalies(client.anomalies(None).await?, anomaly_type, limit),
        None => client.anomalies(limit).await?,
    };

    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Table => {
            if records.is_empty() {
                print_warning("No anomalies found");
                return Ok(());
            }
            print_rows(records.iter().map(AnomalyRow::from).collect());
            println!("\nTotal: {} anomalies", records.len());
        }
    }

    Ok(())
}

/// Keep records of the requested type, then the newest `limit` of them
fn select_anomalies(
    records: Vec<AnomalyRecord>,
    anomaly_type: Option<AnomalyType>,
    limit: Option<usize>,
) -> Vec<AnomalyRecord> {
    let mut selected: Vec<AnomalyRecord> = records
        .into_iter()
        .filter(|r| anomaly_type.map_or(true, |t| r.anomaly_type == t))
        .collect();
    if let Some(limit) = limit {
        let skip = selected.len().saturating_sub(limit);
        selected.drain(..skip);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_lib::{AutoResponseRecord, DetectionAlgorithm};

    fn record(auto_response: Option<AutoResponseRecord>) -> AnomalyRecord {
        AnomalyRecord {
            anomaly_type: AnomalyType::MemoryLeak,
            algorithm: DetectionAlgorithm::Trend,
            metric_value: 2450.0,
            baseline: 1000.0,
            confidence: 0.99,
            timestamp: 0,
            auto_response,
        }
    }

    #[test]
    fn test_row_without_response() {
        let row = AnomalyRow::from(&record(None));
        assert_eq!(row.anomaly_type, "MEMORY_LEAK");
        assert_eq!(row.algorithm, "trend");
        assert_eq!(row.response, "-");
    }

    #[test]
    fn test_row_response_at_floor() {
        let row = AnomalyRow::from(&record(Some(AutoResponseRecord {
            actions: vec![],
            suggestions: vec!["Investigate retained references".to_string()],
            applied: false,
            timestamp: 0,
        })));
        assert_eq!(row.response, "at floor");
    }

    fn typed(anomaly_type: AnomalyType, timestamp: i64) -> AnomalyRecord {
        AnomalyRecord {
            anomaly_type,
            timestamp,
            ..record(None)
        }
    }

    #[test]
    fn test_type_filter_applied_before_limit() {
        // Five spikes after the only two leaks
        let mut records = vec![
            typed(AnomalyType::MemoryLeak, 1),
            typed(AnomalyType::MemoryLeak, 2),
        ];
        records.extend((3..8).map(|ts| typed(AnomalyType::MemorySpike, ts)));

        let leaks = select_anomalies(records.clone(), Some(AnomalyType::MemoryLeak), Some(5));
        assert_eq!(leaks.iter().map(|r| r.timestamp).collect::<Vec<_>>(), vec![1, 2]);

        let spikes = select_anomalies(records.clone(), Some(AnomalyType::MemorySpike), Some(2));
        assert_eq!(spikes.iter().map(|r| r.timestamp).collect::<Vec<_>>(), vec![6, 7]);

        assert_eq!(select_anomalies(records, None, None).len(), 7);
    }

    #[tokio::test]
    async fn test_filtered_listing_fetches_without_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/anomalies")
            .match_query(mockito::Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"type": "MEMORY_LEAK", "algorithm": "trend", "metricValue": 50.0,
                     "baseline": 10.0, "confidence": 0.99, "timestamp": 1700000000000},
                    {"type": "MEMORY_SPIKE", "algorithm": "statistical", "metricValue": 5000.0,
                     "baseline": 1000.0, "confidence": 1.0, "timestamp": 1700000000100}]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        list_anomalies(&client, Some(1), Some(AnomalyType::MemoryLeak), OutputFormat::Json)
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
