//! Metric sampling
//!
//! Bookkeeping for observed units of work: success and failure counters,
//! per-classification counts, the operation frequency window and the
//! bounded list of threshold warnings. Timing and memory measurement around
//! the wrapped call happen in [`crate::PerformanceMonitor`]; this type turns
//! the measurements into data points and warnings.

use std::collections::VecDeque;

use crate::config::MonitorConfig;
use crate::models::{DataPoint, RealtimeStats, Warning, UNCLASSIFIED};

/// Counters and warnings for the sampled pipeline
#[derive(Debug, Clone)]
pub struct MetricSampler {
    memory_threshold: f64,
    creation_time_threshold: f64,
    batch_size_warning: usize,
    frequency_window_ms: i64,
    warning_capacity: usize,
    stats: RealtimeStats,
    warnings: VecDeque<Warning>,
    /// Completion timestamps inside the frequency window
    completions: VecDeque<i64>,
    total_warnings: u64,
}

impl MetricSampler {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            memory_threshold: config.memory_threshold,
            creation_time_threshold: config.creation_time_threshold,
            batch_size_warning: config.batch_size_warning,
            frequency_window_ms: config.frequency_window_ms as i64,
            warning_capacity: config.history_capacity,
            stats: RealtimeStats::default(),
            warnings: VecDeque::with_capacity(config.history_capacity),
            completions: VecDeque::new(),
            total_warnings: 0,
        }
    }

    /// Account for a successful unit of work
    ///
    /// Returns the data point to feed the anomaly engine and, when either
    /// instantaneous threshold is crossed, a SLOW_OR_LARGE warning.
    pub fn record_success(
        &mut self,
        classification: Option<&str>,
        context: &str,
        elapsed_ms: f64,
        memory_delta: f64,
        now: i64,
    ) -> (DataPoint, Option<Warning>) {
        self.stats.total_errors_created += 1;
        let tag = classification.unwrap_or(UNCLASSIFIED);
        match self.stats.error_type_counts.get_mut(tag) {
            Some(count) => *count += 1,
            None => {
                self.stats.error_type_counts.insert(tag.to_string(), 1);
            }
        }

        let n = self.stats.total_errors_created as f64;
        self.stats.average_creation_time += (elapsed_ms - self.stats.average_creation_time) / n;
        self.stats.last_creation_time = elapsed_ms;

        let frequency = self.record_completion(now);
        let point = DataPoint::new(memory_delta, elapsed_ms, frequency as f64, now);

        let warning = if elapsed_ms > self.creation_time_threshold || memory_delta > self.memory_threshold {
            let warning = Warning::slow_or_large(context, elapsed_ms, memory_delta, now);
            self.push_warning(warning.clone());
            Some(warning)
        } else {
            None
        };

        (point, warning)
    }

    /// Account for a unit of work that returned an error or panicked
    pub fn record_failure(&mut self, elapsed_ms: f64) {
        self.stats.failed_operations += 1;
        self.stats.last_creation_time = elapsed_ms;
    }

    /// Count a batch and warn when it exceeds the configured size
    pub fn record_batch(&mut self, batch_size: usize, now: i64) -> Option<Warning> {
        self.stats.batch_operations += 1;
        if batch_size <= self.batch_size_warning {
            return None;
        }
        let warning = Warning::frequent_operations(batch_size, now);
        self.push_warning(warning.clone());
        Some(warning)
    }

    fn record_completion(&mut self, now: i64) -> usize {
        self.completions.push_back(now);
        let cutoff = now - self.frequency_window_ms;
        while let Some(ts) = self.completions.front() {
            if *ts <= cutoff {
                self.completions.pop_front();
            } else {
                break;
            }
        }
        self.completions.len()
    }

    fn push_warning(&mut self, warning: Warning) {
        self.total_warnings += 1;
        while self.warnings.len() >= self.warning_capacity {
            self.warnings.pop_front();
        }
        self.warnings.push_back(warning);
    }

    /// Last `limit` warnings, oldest first
    pub fn recent_warnings(&self, limit: usize) -> Vec<Warning> {
        let skip = self.warnings.len().saturating_sub(limit);
        self.warnings.iter().skip(skip).cloned().collect()
    }

    pub fn has_warning_since(&self, since_ms: i64) -> bool {
        self.warnings.iter().any(|w| w.timestamp >= since_ms)
    }

    /// Drop warnings older than `cutoff_ms`; returns how many went
    pub fn trim_older_than(&mut self, cutoff_ms: i64) -> usize {
        let before = self.warnings.len();
        self.warnings.retain(|w| w.timestamp >= cutoff_ms);
        before - self.warnings.len()
    }

    pub fn stats(&self) -> &RealtimeStats {
        &self.stats
    }

    pub fn total_warnings(&self) -> u64 {
        self.total_warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WarningType;

    fn sampler() -> MetricSampler {
        MetricSampler::new(&MonitorConfig::default())
    }

    #[test]
    fn test_success_counts_by_classification() {
        let mut sampler = sampler();
        sampler.record_success(Some("TIMEOUT_ERROR"), "create", 0.2, 0.0, 1000);
        sampler.record_success(Some("TIMEOUT_ERROR"), "create", 0.4, 0.0, 1001);
        sampler.record_success(None, "create", 0.6, 0.0, 1002);

        let stats = sampler.stats();
        assert_eq!(stats.total_errors_created, 3);
        assert_eq!(stats.error_type_counts.get("TIMEOUT_ERROR"), Some(&2));
        assert_eq!(stats.error_type_counts.get(UNCLASSIFIED), Some(&1));
        assert!((stats.average_creation_time - 0.4).abs() < 1e-12);
        assert_eq!(stats.last_creation_time, 0.6);
    }

    #[test]
    fn test_slow_unit_warns() {
        let mut sampler = sampler();
        let (point, warning) = sampler.record_success(None, "render", 12.0, 0.0, 5);

        assert_eq!(point.creation_time, 12.0);
        let warning = warning.expect("slow unit should warn");
        assert_eq!(warning.warning_type, WarningType::SlowOrLarge);
        assert_eq!(warning.context.as_deref(), Some("render"));
        assert_eq!(sampler.recent_warnings(20).len(), 1);
    }

    #[test]
    fn test_large_unit_warns() {
        let mut sampler = sampler();
        let (_, warning) = sampler.record_success(None, "parse", 0.1, 8.0 * 1024.0 * 1024.0, 5);
        assert!(warning.is_some());

        let (_, warning) = sampler.record_success(None, "parse", 0.1, 512.0, 6);
        assert!(warning.is_none());
    }

    #[test]
    fn test_failures_counted_separately() {
        let mut sampler = sampler();
        sampler.record_failure(0.3);
        sampler.record_success(None, "create", 0.1, 0.0, 1);

        assert_eq!(sampler.stats().failed_operations, 1);
        assert_eq!(sampler.stats().total_errors_created, 1);
    }

    #[test]
    fn test_batch_warning_threshold() {
        let mut sampler = sampler();
        assert!(sampler.record_batch(100, 1).is_none());

        let warning = sampler.record_batch(150, 2).unwrap();
        assert_eq!(warning.warning_type, WarningType::FrequentOperations);
        assert_eq!(warning.batch_size, Some(150));
        assert_eq!(sampler.stats().batch_operations, 2);
    }

    #[test]
    fn test_frequency_window() {
        let mut sampler = sampler();
        let (p1, _) = sampler.record_success(None, "c", 0.1, 0.0, 0);
        let (p2, _) = sampler.record_success(None, "c", 0.1, 0.0, 400);
        let (p3, _) = sampler.record_success(None, "c", 0.1, 0.0, 900);
        let (p4, _) = sampler.record_success(None, "c", 0.1, 0.0, 1500);

        assert_eq!(p1.error_frequency, 1.0);
        assert_eq!(p2.error_frequency, 2.0);
        assert_eq!(p3.error_frequency, 3.0);
        // 0 and 400 fell out of the one-second window
        assert_eq!(p4.error_frequency, 2.0);
    }

    #[test]
    fn test_warning_history_bounded() {
        let config = MonitorConfig {
            history_capacity: 20,
            ..Default::default()
        };
        let mut sampler = MetricSampler::new(&config);
        for i in 0..50 {
            sampler.record_batch(500, i);
        }

        let recent = sampler.recent_warnings(100);
        assert_eq!(recent.len(), 20);
        assert_eq!(recent.first().map(|w| w.timestamp), Some(30));
        assert_eq!(sampler.total_warnings(), 50);
    }

    #[test]
    fn test_trim_and_recency() {
        let mut sampler = sampler();
        sampler.record_batch(500, 100);
        sampler.record_batch(500, 200);

        assert!(sampler.has_warning_since(150));
        assert_eq!(sampler.trim_older_than(150), 1);
        assert!(!sampler.has_warning_since(250));
    }
}
