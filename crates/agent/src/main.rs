//! Performance monitor agent
//!
//! Runs the performance monitor against a synthetic classified-error
//! workload and serves health, metrics and monitor snapshots over HTTP.

use anyhow::{Context, Result};
use monitor_lib::{MonitorMetrics, PerformanceMonitor};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod workload;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = AGENT_VERSION, "Starting perf-monitor-agent");

    // Load configuration
    let config = config::AgentConfig::load()?;
    let monitor_config = config
        .monitor_config()
        .context("Invalid monitor configuration")?;
    info!(
        instance = %config.instance_name,
        window_size = monitor_config.window_size,
        sensitivity = %monitor_config.sensitivity_level,
        auto_response = monitor_config.auto_response,
        "Agent configured"
    );

    // Initialize metrics and the monitor
    let metrics = MonitorMetrics::new();
    let monitor = PerformanceMonitor::builder(monitor_config)
        .pipeline(config.instance_name.clone())
        .metrics(metrics)
        .build()?;
    monitor.start();

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Drive the synthetic workload
    let workload = workload::Workload::new(monitor.clone(), config.workload());
    let workload_handle = tokio::spawn(workload.run(shutdown_tx.subscribe()));

    // Start health, metrics and snapshot server
    let app_state = Arc::new(api::AppState::new(monitor.clone(), config.instance_name.clone()));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal or a server failure
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("SIGINT received, shutting down");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => info!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = workload_handle.await {
        error!(error = %e, "Workload task failed");
    }
    monitor.stop();

    Ok(())
}
