//! HTTP API for health checks, Prometheus metrics and monitor snapshots

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use monitor_lib::{HealthStatus, PerformanceMonitor};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub monitor: PerformanceMonitor,
    pub instance_name: String,
}

impl AppState {
    pub fn new(monitor: PerformanceMonitor, instance_name: impl Into<String>) -> Self {
        Self {
            monitor,
            instance_name: instance_name.into(),
        }
    }
}

/// Health check body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub instance: String,
    pub is_detecting: bool,
}

/// `?limit=N` for list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.monitor.health();

    let status_code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // Still operational
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            instance: state.instance_name.clone(),
            is_detecting: state.monitor.is_detecting(),
        }),
    )
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.monitor.readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.realtime_status())
}

async fn report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.monitor.generate_report())
}

async fn anomalies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> impl IntoResponse {
    let mut records = state.monitor.generate_report().recent_anomalies;
    if let Some(limit) = params.limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }
    Json(records)
}

async fn warnings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> impl IntoResponse {
    let mut warnings = state.monitor.realtime_status().recent_warnings;
    if let Some(limit) = params.limit {
        let skip = warnings.len().saturating_sub(limit);
        warnings.drain(..skip);
    }
    Json(warnings)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/status", get(status))
        .route("/api/v1/report", get(report))
        .route("/api/v1/anomalies", get(anomalies))
        .route("/api/v1/warnings", get(warnings))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
