//! Status and report assembly
//!
//! Both documents are snapshots built under the monitor lock and returned
//! by value; nothing here holds references into live state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::anomaly::AnomalyEngine;
use crate::config::{MonitorConfig, SensitivityLevel};
use crate::health::HealthStatus;
use crate::models::{AnomalyRecord, AnomalyType, Metric, RealtimeStats, Warning};
use crate::sampler::MetricSampler;
use crate::window::MetricSummary;

/// Live counters, recent warnings and derived health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStatus {
    pub is_monitoring: bool,
    pub realtime_stats: RealtimeStats,
    pub recent_warnings: Vec<Warning>,
    pub health_status: HealthStatus,
}

/// Whether detection is running and how it is tuned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStatus {
    pub is_detecting: bool,
    pub sensitivity_level: SensitivityLevel,
    pub confidence_threshold: f64,
    pub auto_response: bool,
}

/// Aggregate anomaly counters and current window baselines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyStatistics {
    pub total_anomalies: u64,
    pub counts_by_type: BTreeMap<AnomalyType, u64>,
    pub auto_responses: u64,
    pub suppressed: u64,
    pub window_size: usize,
    pub samples_in_window: usize,
    pub baselines: BTreeMap<Metric, MetricSummary>,
}

/// Anomaly detection report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    pub detection_status: DetectionStatus,
    pub statistics: AnomalyStatistics,
    pub recent_anomalies: Vec<AnomalyRecord>,
    pub generated_at: i64,
}

/// Builds [`RealtimeStatus`] and [`AnomalyReport`] snapshots
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    sensitivity_level: SensitivityLevel,
    confidence_threshold: f64,
    auto_response: bool,
    health_window_ms: i64,
    recent_warning_limit: usize,
    recent_anomaly_limit: usize,
}

impl ReportGenerator {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            sensitivity_level: config.sensitivity_level,
            confidence_threshold: config.confidence_threshold,
            auto_response: config.auto_response,
            health_window_ms: config.health_window().as_millis() as i64,
            recent_warning_limit: config.recent_warning_limit,
            recent_anomaly_limit: config.recent_anomaly_limit,
        }
    }

    /// Health over the lookback window ending at `now`
    pub fn health(&self, sampler: &MetricSampler, engine: &AnomalyEngine, now: i64) -> HealthStatus {
        let since = now - self.health_window_ms;
        HealthStatus::derive(sampler.has_warning_since(since), engine.has_anomaly_since(since))
    }

    pub fn realtime_status(
        &self,
        is_monitoring: bool,
        sampler: &MetricSampler,
        engine: &AnomalyEngine,
        now: i64,
    ) -> RealtimeStatus {
        RealtimeStatus {
            is_monitoring,
            realtime_stats: sampler.stats().clone(),
            recent_warnings: sampler.recent_warnings(self.recent_warning_limit),
            health_status: self.health(sampler, engine, now),
        }
    }

    pub fn anomaly_report(&self, is_detecting: bool, engine: &AnomalyEngine, now: i64) -> AnomalyReport {
        let baselines = Metric::ALL
            .iter()
            .map(|metric| (*metric, engine.summary(*metric)))
            .collect();

        AnomalyReport {
            detection_status: DetectionStatus {
                is_detecting,
                sensitivity_level: self.sensitivity_level,
                confidence_threshold: self.confidence_threshold,
                auto_response: self.auto_response,
            },
            statistics: AnomalyStatistics {
                total_anomalies: engine.total_anomalies(),
                counts_by_type: engine.counts_by_type().clone(),
                auto_responses: engine.auto_responses(),
                suppressed: engine.suppressed(),
                window_size: engine.window_capacity(),
                samples_in_window: engine.window_len(),
                baselines,
            },
            recent_anomalies: engine.recent(self.recent_anomaly_limit),
            generated_at: now,
        }
    }
}
