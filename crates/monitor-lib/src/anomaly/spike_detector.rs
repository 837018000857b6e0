//! Statistical spike detection
//!
//! Scores each new observation against the window's running mean and
//! standard deviation. The z-score threshold comes from the configured
//! sensitivity level; confidence grows linearly from zero at the threshold
//! and saturates at 1.0 once the deviation reaches twice the threshold.

use crate::config::SensitivityLevel;
use crate::error::SkipReason;
use crate::models::{AnomalyType, Metric};
use crate::window::RunningStatistics;

/// Detects instantaneous deviations via z-score
#[derive(Debug, Clone)]
pub struct StatisticalDetector {
    /// Number of standard deviations that constitutes an anomaly
    pub z_threshold: f64,
    /// Samples required before any score is computed
    pub min_samples: usize,
}

impl StatisticalDetector {
    pub fn new(sensitivity: SensitivityLevel, min_samples: usize) -> Self {
        Self {
            z_threshold: sensitivity.z_threshold(),
            min_samples,
        }
    }

    /// Anomaly type raised for a metric, if the metric is scored at all
    pub fn anomaly_type(metric: Metric) -> Option<AnomalyType> {
        match metric {
            Metric::MemoryUsage => Some(AnomalyType::MemorySpike),
            Metric::CreationTime => Some(AnomalyType::SlowCreation),
            Metric::ErrorFrequency => None,
        }
    }

    /// Score `current` against the window statistics
    ///
    /// # Returns
    /// * `Ok(Some(SpikeAnomaly))` if the z-score exceeds the threshold
    /// * `Ok(None)` if the value is within the normal band
    /// * `Err(SkipReason)` if the statistics cannot support a score
    pub fn detect(
        &self,
        metric: Metric,
        current: f64,
        history: &RunningStatistics,
    ) -> Result<Option<SpikeAnomaly>, SkipReason> {
        if history.count() < self.min_samples as u64 {
            return Err(SkipReason::ColdWindow);
        }

        let mean = history.mean(metric);
        let std_dev = history.std_dev(metric);
        if !mean.is_finite() || !std_dev.is_finite() || !current.is_finite() {
            return Err(SkipReason::NonFinite);
        }
        // Avoid division by zero
        if std_dev < f64::EPSILON {
            return Err(SkipReason::ZeroVariance);
        }

        let z_score = (current - mean).abs() / std_dev;
        if z_score <= self.z_threshold {
            return Ok(None);
        }

        Ok(Some(SpikeAnomaly {
            metric,
            current_value: current,
            expected_value: mean,
            z_score,
            std_dev,
            threshold: self.z_threshold,
        }))
    }
}

impl Default for StatisticalDetector {
    fn default() -> Self {
        Self::new(SensitivityLevel::default(), crate::config::DEFAULT_MIN_SAMPLES)
    }
}

/// Deviation details for a single metric
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeAnomaly {
    pub metric: Metric,
    /// Value that triggered the spike
    pub current_value: f64,
    /// Window mean before the value was inserted
    pub expected_value: f64,
    pub z_score: f64,
    pub std_dev: f64,
    /// Threshold that was exceeded
    pub threshold: f64,
}

impl SpikeAnomaly {
    /// Normalized confidence in [0, 1]
    pub fn confidence(&self) -> f64 {
        if self.threshold <= 0.0 {
            return 1.0;
        }
        ((self.z_score - self.threshold) / self.threshold).clamp(0.0, 1.0)
    }
}
