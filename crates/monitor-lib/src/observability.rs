//! Observability infrastructure for the performance monitor
//!
//! Provides:
//! - Prometheus metrics (unit-of-work latency, warning and anomaly counters, window size)
//! - Structured logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::{AnomalyRecord, AnomalyType, AutoResponseRecord, DetectionAlgorithm, Warning};

/// Histogram buckets for unit-of-work latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05, 0.1, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct MonitorMetricsInner {
    unit_duration_seconds: Histogram,
    units_observed: IntCounter,
    units_failed: IntCounter,
    warnings_emitted: IntCounterVec,
    anomalies_detected: IntCounterVec,
    auto_responses: IntCounterVec,
    window_capacity: IntGauge,
    window_points: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            unit_duration_seconds: register_histogram!(
                "perf_monitor_unit_duration_seconds",
                "Wall-clock time spent in monitored units of work",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register unit_duration_seconds"),

            units_observed: register_int_counter!(
                "perf_monitor_units_observed_total",
                "Total number of successful units of work observed"
            )
            .expect("Failed to register units_observed"),

            units_failed: register_int_counter!(
                "perf_monitor_units_failed_total",
                "Total number of units of work that returned an error or panicked"
            )
            .expect("Failed to register units_failed"),

            warnings_emitted: register_int_counter_vec!(
                "perf_monitor_warnings_total",
                "Threshold warnings emitted by the sampler",
                &["type"]
            )
            .expect("Failed to register warnings_emitted"),

            anomalies_detected: register_int_counter_vec!(
                "perf_monitor_anomalies_total",
                "Anomalies surfaced by the detection engine",
                &["type", "algorithm"]
            )
            .expect("Failed to register anomalies_detected"),

            auto_responses: register_int_counter_vec!(
                "perf_monitor_auto_responses_total",
                "Auto-responses dispatched for confirmed anomalies",
                &["action", "applied"]
            )
            .expect("Failed to register auto_responses"),

            window_capacity: register_int_gauge!(
                "perf_monitor_window_capacity",
                "Current capacity of the sliding window"
            )
            .expect("Failed to register window_capacity"),

            window_points: register_int_gauge!(
                "perf_monitor_window_points",
                "Number of data points currently in the sliding window"
            )
            .expect("Failed to register window_points"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_unit_duration(&self, duration_secs: f64) {
        self.inner().unit_duration_seconds.observe(duration_secs);
    }

    pub fn inc_units_observed(&self) {
        self.inner().units_observed.inc();
    }

    pub fn inc_units_failed(&self) {
        self.inner().units_failed.inc();
    }

    pub fn inc_warning(&self, warning: &Warning) {
        self.inner()
            .warnings_emitted
            .with_label_values(&[&warning.warning_type.to_string()])
            .inc();
    }

    pub fn inc_anomaly(&self, anomaly_type: AnomalyType, algorithm: DetectionAlgorithm) {
        self.inner()
            .anomalies_detected
            .with_label_values(&[anomaly_type.as_str(), &algorithm.to_string()])
            .inc();
    }

    pub fn inc_auto_response(&self, record: &AutoResponseRecord) {
        let applied = if record.applied { "true" } else { "false" };
        for action in &record.actions {
            self.inner()
                .auto_responses
                .with_label_values(&[action.as_str(), applied])
                .inc();
        }
    }

    pub fn set_window(&self, capacity: usize, points: usize) {
        self.inner().window_capacity.set(capacity as i64);
        self.inner().window_points.set(points as i64);
    }
}

/// Structured logger for monitor events
///
/// Provides consistent field names for warnings, anomalies and
/// lifecycle transitions.
#[derive(Clone)]
pub struct StructuredLogger {
    pipeline: String,
}

impl StructuredLogger {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
        }
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Log a sampler threshold warning
    pub fn log_warning(&self, warning: &Warning) {
        info!(
            event = "threshold_warning",
            pipeline = %self.pipeline,
            warning_type = %warning.warning_type,
            batch_size = ?warning.batch_size,
            context = ?warning.context,
            creation_time_ms = ?warning.creation_time,
            memory_delta_bytes = ?warning.memory_delta,
            timestamp = warning.timestamp,
            "Threshold warning"
        );
    }

    /// Log a confirmed anomaly
    pub fn log_anomaly(&self, record: &AnomalyRecord) {
        match record.algorithm {
            DetectionAlgorithm::Statistical => {
                warn!(
                    event = "anomaly_detected",
                    pipeline = %self.pipeline,
                    anomaly_type = %record.anomaly_type,
                    algorithm = %record.algorithm,
                    value = record.metric_value,
                    baseline = record.baseline,
                    confidence = record.confidence,
                    "Spike detected"
                );
            }
            DetectionAlgorithm::Trend => {
                warn!(
                    event = "anomaly_detected",
                    pipeline = %self.pipeline,
                    anomaly_type = %record.anomaly_type,
                    algorithm = %record.algorithm,
                    slope_per_observation = record.metric_value,
                    slope_threshold = record.baseline,
                    confidence = record.confidence,
                    "Sustained trend detected"
                );
            }
        }
    }

    /// Log an auto-response
    pub fn log_auto_response(&self, anomaly_type: AnomalyType, record: &AutoResponseRecord) {
        info!(
            event = "auto_response",
            pipeline = %self.pipeline,
            anomaly_type = %anomaly_type,
            actions = ?record.actions,
            suggestions = ?record.suggestions,
            applied = record.applied,
            "Auto-response dispatched"
        );
    }

    /// Log detection start
    pub fn log_start(&self, window_size: usize, sensitivity: &str) {
        info!(
            event = "detection_started",
            pipeline = %self.pipeline,
            window_size = window_size,
            sensitivity = %sensitivity,
            "Performance monitor started"
        );
    }

    /// Log detection stop
    pub fn log_stop(&self, reason: &str) {
        info!(
            event = "detection_stopped",
            pipeline = %self.pipeline,
            reason = %reason,
            "Performance monitor stopped"
        );
    }
}
