//! Anomaly engine
//!
//! Runs both detectors on every insertion into the sliding window. The
//! statistical detector scores the incoming point against the window as it
//! stood before the insertion; the trend detector evaluates the fit after
//! it. Each detector emits independently, so one insertion can produce zero,
//! one or several records. Records below the confidence threshold are
//! dropped before anything else sees them.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use super::{AutoResponseDispatcher, StatisticalDetector, TrendDetector};
use crate::config::MonitorConfig;
use crate::error::SkipReason;
use crate::models::{AnomalyRecord, AnomalyType, DataPoint, DetectionAlgorithm, Metric};
use crate::window::{MetricSummary, RunningStatistics, SlidingWindowBuffer};

/// Metrics scored by the detectors
const SCORED_METRICS: [Metric; 2] = [Metric::MemoryUsage, Metric::CreationTime];

/// Removals after which the running statistics are recomputed from the window
const STATS_REBUILD_INTERVAL: u64 = 4096;

/// Window, statistics, detectors and anomaly history
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
    buffer: SlidingWindowBuffer,
    stats: RunningStatistics,
    statistical: StatisticalDetector,
    trend: TrendDetector,
    dispatcher: AutoResponseDispatcher,
    confidence_threshold: f64,
    history: VecDeque<AnomalyRecord>,
    history_capacity: usize,
    total_anomalies: u64,
    counts_by_type: BTreeMap<AnomalyType, u64>,
    suppressed: u64,
}

impl AnomalyEngine {
    pub fn new(config: &MonitorConfig) -> Self {
        let min_samples = config.effective_min_samples();
        Self {
            buffer: SlidingWindowBuffer::new(config.window_size, config.min_window_size),
            stats: RunningStatistics::new(),
            statistical: StatisticalDetector::new(config.sensitivity_level, min_samples),
            trend: TrendDetector::new(
                config.r_squared_floor,
                config.leak_rate_threshold,
                config.degradation_rate_threshold,
                min_samples,
            ),
            dispatcher: AutoResponseDispatcher::new(config.auto_response),
            confidence_threshold: config.confidence_threshold,
            history: VecDeque::with_capacity(config.history_capacity),
            history_capacity: config.history_capacity,
            total_anomalies: 0,
            counts_by_type: BTreeMap::new(),
            suppressed: 0,
        }
    }

    /// Insert a point and run both detectors
    ///
    /// Returns the surfaced records, auto-responses already attached.
    pub fn observe(&mut self, point: DataPoint) -> Vec<AnomalyRecord> {
        let mut records = Vec::new();

        for metric in SCORED_METRICS {
            match self.statistical.detect(metric, point.value(metric), &self.stats) {
                Ok(Some(spike)) => {
                    let Some(anomaly_type) = StatisticalDetector::anomaly_type(metric) else {
                        continue;
                    };
                    self.gate(
                        &mut records,
                        AnomalyRecord {
                            anomaly_type,
                            algorithm: DetectionAlgorithm::Statistical,
                            metric_value: spike.current_value,
                            baseline: spike.expected_value,
                            confidence: spike.confidence(),
                            timestamp: point.timestamp,
                            auto_response: None,
                        },
                    );
                }
                Ok(None) => {}
                Err(reason) => log_skip(DetectionAlgorithm::Statistical, metric, reason),
            }
        }

        if let Some(evicted) = self.buffer.add(point) {
            self.stats.remove(&evicted);
        }
        self.stats.add(&point);
        if self.stats.removed_since_rebuild() >= STATS_REBUILD_INTERVAL {
            self.stats.rebuild(self.buffer.iter());
            trace!(samples = self.stats.count(), "Window statistics rebuilt");
        }

        for metric in SCORED_METRICS {
            match self.trend.detect(metric, &self.stats) {
                Ok(Some(trend)) => {
                    let Some(anomaly_type) = TrendDetector::anomaly_type(metric) else {
                        continue;
                    };
                    self.gate(
                        &mut records,
                        AnomalyRecord {
                            anomaly_type,
                            algorithm: DetectionAlgorithm::Trend,
                            metric_value: trend.slope_per_observation,
                            baseline: trend.slope_threshold,
                            confidence: trend.confidence(),
                            timestamp: point.timestamp,
                            auto_response: None,
                        },
                    );
                }
                Ok(None) => {}
                Err(reason) => log_skip(DetectionAlgorithm::Trend, metric, reason),
            }
        }

        for record in records.iter_mut() {
            record.auto_response = self.dispatcher.dispatch(
                record.anomaly_type,
                &mut self.buffer,
                &mut self.stats,
                point.timestamp,
            );
            self.remember(record.clone());
        }

        records
    }

    /// Keep a candidate only if it clears the confidence threshold
    fn gate(&mut self, records: &mut Vec<AnomalyRecord>, candidate: AnomalyRecord) {
        if candidate.confidence >= self.confidence_threshold {
            records.push(candidate);
        } else {
            self.suppressed += 1;
            debug!(
                anomaly_type = %candidate.anomaly_type,
                algorithm = %candidate.algorithm,
                confidence = candidate.confidence,
                threshold = self.confidence_threshold,
                "Anomaly candidate below confidence threshold"
            );
        }
    }

    fn remember(&mut self, record: AnomalyRecord) {
        self.total_anomalies += 1;
        *self.counts_by_type.entry(record.anomaly_type).or_insert(0) += 1;

        while self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// Drop retained records older than `cutoff_ms`; returns how many went
    pub fn trim_older_than(&mut self, cutoff_ms: i64) -> usize {
        let before = self.history.len();
        self.history.retain(|r| r.timestamp >= cutoff_ms);
        before - self.history.len()
    }

    /// Last `limit` retained records, oldest first
    pub fn recent(&self, limit: usize) -> Vec<AnomalyRecord> {
        let skip = self.history.len().saturating_sub(limit);
        let mut recent: Vec<AnomalyRecord> = self.history.iter().skip(skip).cloned().collect();
        recent.sort_by_key(|r| r.timestamp);
        recent
    }

    /// Whether any retained record is at least as new as `since_ms`
    pub fn has_anomaly_since(&self, since_ms: i64) -> bool {
        self.history.iter().any(|r| r.timestamp >= since_ms)
    }

    pub fn snapshot(&self) -> Vec<DataPoint> {
        self.buffer.snapshot()
    }

    pub fn window_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn window_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn total_anomalies(&self) -> u64 {
        self.total_anomalies
    }

    pub fn counts_by_type(&self) -> &BTreeMap<AnomalyType, u64> {
        &self.counts_by_type
    }

    /// Candidates dropped by the confidence gate
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    pub fn auto_responses(&self) -> u64 {
        self.dispatcher.dispatched()
    }

    pub fn summary(&self, metric: Metric) -> MetricSummary {
        self.stats.summary(metric)
    }
}

fn log_skip(algorithm: DetectionAlgorithm, metric: Metric, reason: SkipReason) {
    match reason {
        // Expected on every tick until the window warms up
        SkipReason::ColdWindow => trace!(
            algorithm = %algorithm,
            metric = %metric,
            "Detection skipped: cold window"
        ),
        _ => debug!(
            event = "computation_skipped",
            algorithm = %algorithm,
            metric = %metric,
            reason = %reason,
            "Detection skipped for this tick"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensitivityLevel;

    fn jitter(i: i64, amplitude: f64) -> f64 {
        // Deterministic spread in [-amplitude, amplitude]
        (((i * 37) % 21) as f64 - 10.0) / 10.0 * amplitude
    }

    fn baseline(i: i64) -> DataPoint {
        DataPoint::new(1000.0 + jitter(i, 50.0), 0.5 + jitter(i + 3, 0.05), 1.0, i * 100)
    }

    fn high_sensitivity() -> MonitorConfig {
        MonitorConfig::default()
            .with_window_size(50)
            .with_sensitivity(SensitivityLevel::High)
            .with_confidence_threshold(0.8)
    }

    #[test]
    fn test_spike_after_baseline() {
        let mut engine = AnomalyEngine::new(&high_sensitivity());
        for i in 0..49 {
            assert!(engine.observe(baseline(i)).is_empty());
        }

        let records = engine.observe(DataPoint::new(5000.0, 0.5, 1.0, 4900));
        let spike = records
            .iter()
            .find(|r| r.anomaly_type == AnomalyType::MemorySpike)
            .expect("memory spike expected");
        assert_eq!(spike.algorithm, DetectionAlgorithm::Statistical);
        assert!(spike.confidence >= 0.8);
        assert_eq!(spike.metric_value, 5000.0);
        assert!((spike.baseline - 1000.0).abs() < 50.0);
        assert_eq!(engine.window_len(), 50);
    }

    #[test]
    fn test_linear_growth_raises_leak() {
        let mut engine = AnomalyEngine::new(&high_sensitivity());
        let mut leaks = Vec::new();
        for i in 0..25 {
            let point = DataPoint::new(1000.0 + 50.0 * i as f64, 0.5, 1.0, i * 100);
            leaks.extend(
                engine
                    .observe(point)
                    .into_iter()
                    .filter(|r| r.anomaly_type == AnomalyType::MemoryLeak),
            );
        }

        assert!(!leaks.is_empty());
        assert!(leaks.iter().all(|r| r.algorithm == DetectionAlgorithm::Trend));
        assert!(leaks.iter().all(|r| r.confidence >= 0.8));
    }

    #[test]
    fn test_cold_window_emits_nothing() {
        let mut engine = AnomalyEngine::new(&high_sensitivity());
        for i in 0..5 {
            assert!(engine.observe(baseline(i)).is_empty());
        }
        // Huge outlier and steep growth, but the window is still cold
        assert!(engine
            .observe(DataPoint::new(1_000_000.0, 50.0, 1.0, 500))
            .is_empty());
    }

    #[test]
    fn test_confidence_gate_suppresses() {
        let config = high_sensitivity().with_confidence_threshold(1.0);
        let mut engine = AnomalyEngine::new(&config);
        for i in 0..49 {
            engine.observe(baseline(i));
        }
        // z ~ 3 with threshold 2 -> confidence ~ 0.5
        let std_dev = engine.summary(Metric::MemoryUsage).std_dev;
        let mean = engine.summary(Metric::MemoryUsage).mean;
        let records = engine.observe(DataPoint::new(mean + 3.0 * std_dev, 0.5, 1.0, 4900));

        assert!(records.iter().all(|r| r.anomaly_type != AnomalyType::MemorySpike));
        assert!(engine.suppressed() >= 1);
    }

    #[test]
    fn test_spike_and_trend_recorded_separately() {
        let mut engine = AnomalyEngine::new(&high_sensitivity());
        for i in 0..30 {
            engine.observe(DataPoint::new(1000.0 + 50.0 * i as f64, 0.5 + jitter(i, 0.05), 1.0, i * 100));
        }
        let records = engine.observe(DataPoint::new(1000.0 + 50.0 * 30.0, 5.0, 1.0, 3000));

        assert!(records
            .iter()
            .any(|r| r.anomaly_type == AnomalyType::SlowCreation
                && r.algorithm == DetectionAlgorithm::Statistical));
        assert!(records
            .iter()
            .any(|r| r.anomaly_type == AnomalyType::MemoryLeak
                && r.algorithm == DetectionAlgorithm::Trend));
    }

    #[test]
    fn test_auto_response_attached_and_window_reduced() {
        let config = high_sensitivity().with_auto_response(true);
        let mut engine = AnomalyEngine::new(&config);
        for i in 0..49 {
            engine.observe(baseline(i));
        }
        let records = engine.observe(DataPoint::new(5000.0, 0.5, 1.0, 4900));

        let spike = records
            .iter()
            .find(|r| r.anomaly_type == AnomalyType::MemorySpike)
            .unwrap();
        let response = spike.auto_response.as_ref().expect("auto-response attached");
        assert_eq!(response.actions, vec!["reduce_window_size"]);
        assert!(engine.window_capacity() <= 25);
        assert_eq!(engine.window_len(), engine.window_capacity());
        assert_eq!(
            engine.recent(10).last().and_then(|r| r.auto_response.clone()),
            records.last().and_then(|r| r.auto_response.clone())
        );
    }

    #[test]
    fn test_history_bounded_and_counts_monotonic() {
        let config = MonitorConfig {
            history_capacity: 20,
            recent_anomaly_limit: 20,
            recent_warning_limit: 20,
            ..high_sensitivity()
        };
        let mut engine = AnomalyEngine::new(&config);
        for i in 0..200 {
            engine.observe(DataPoint::new(1000.0 + 50.0 * i as f64, 0.5, 1.0, i * 100));
        }

        assert!(engine.total_anomalies() > 20);
        assert_eq!(engine.recent(100).len(), 20);
        assert_eq!(
            engine.counts_by_type().values().sum::<u64>(),
            engine.total_anomalies()
        );
    }

    #[test]
    fn test_long_run_statistics_stay_exact() {
        let mut engine = AnomalyEngine::new(&high_sensitivity());
        let total = STATS_REBUILD_INTERVAL as i64 * 3 + 17;
        for i in 0..total {
            engine.observe(DataPoint::new(1.0e6 + 50.0 * i as f64, 0.5 + jitter(i, 0.05), 1.0, i));
        }

        let mut fresh = RunningStatistics::new();
        fresh.rebuild(engine.snapshot().iter());
        let summary = engine.summary(Metric::MemoryUsage);
        assert_eq!(engine.window_len(), 50);
        assert!((summary.mean - fresh.mean(Metric::MemoryUsage)).abs() < 1e-6);
        assert!((summary.slope.unwrap() - 50.0).abs() < 1e-4);
        assert!(summary.r_squared.unwrap() > 0.999_999);
    }

    #[test]
    fn test_min_samples_above_window_still_detects() {
        // Default minimum of 10 samples can never fill a 5 point window
        let config = high_sensitivity().with_window_size(5);
        let mut engine = AnomalyEngine::new(&config);
        let mut leaks = 0;
        for i in 0..20 {
            leaks += engine
                .observe(DataPoint::new(1000.0 + 50.0 * i as f64, 0.5, 1.0, i * 100))
                .iter()
                .filter(|r| r.anomaly_type == AnomalyType::MemoryLeak)
                .count();
        }

        assert!(leaks > 0);
    }

    #[test]
    fn test_trim_older_than() {
        let mut engine = AnomalyEngine::new(&high_sensitivity());
        for i in 0..40 {
            engine.observe(DataPoint::new(1000.0 + 50.0 * i as f64, 0.5, 1.0, i * 100));
        }
        let total = engine.recent(usize::MAX).len();
        let dropped = engine.trim_older_than(3000);

        assert!(dropped > 0);
        assert!(engine.recent(usize::MAX).iter().all(|r| r.timestamp >= 3000));
        assert_eq!(engine.recent(usize::MAX).len(), total - dropped);
        assert!(engine.has_anomaly_since(3500));
        assert!(!engine.has_anomaly_since(10_000));
    }
}
