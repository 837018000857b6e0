//! Trend detection
//!
//! Flags sustained upward drift using the window's running least-squares
//! fit: a per-observation slope above the per-metric rate threshold
//! combined with an R² above the fit-quality floor. Growing memory deltas indicate a leak;
//! growing creation times indicate batch degradation.

use crate::error::SkipReason;
use crate::models::{AnomalyType, Metric};
use crate::window::RunningStatistics;

/// Detects sustained growth via linear regression over the window
#[derive(Debug, Clone)]
pub struct TrendDetector {
    /// Minimum R² for the fit to count as a trend
    pub r_squared_floor: f64,
    /// Minimum memory slope in bytes per observation
    pub leak_rate_threshold: f64,
    /// Minimum creation time slope in milliseconds per observation
    pub degradation_rate_threshold: f64,
    /// Samples required before any fit is evaluated
    pub min_samples: usize,
}

impl TrendDetector {
    pub fn new(
        r_squared_floor: f64,
        leak_rate_threshold: f64,
        degradation_rate_threshold: f64,
        min_samples: usize,
    ) -> Self {
        Self {
            r_squared_floor,
            leak_rate_threshold,
            degradation_rate_threshold,
            min_samples,
        }
    }

    pub fn anomaly_type(metric: Metric) -> Option<AnomalyType> {
        match metric {
            Metric::MemoryUsage => Some(AnomalyType::MemoryLeak),
            Metric::CreationTime => Some(AnomalyType::BatchDegradation),
            Metric::ErrorFrequency => None,
        }
    }

    /// Slope a metric must exceed to be reported
    pub fn slope_threshold(&self, metric: Metric) -> f64 {
        match metric {
            Metric::MemoryUsage => self.leak_rate_threshold,
            Metric::CreationTime => self.degradation_rate_threshold,
            Metric::ErrorFrequency => f64::INFINITY,
        }
    }

    /// Evaluate the current window fit for a metric
    ///
    /// # Returns
    /// * `Ok(Some(TrendAnomaly))` for a positive, well-fitted slope above threshold
    /// * `Ok(None)` if no sustained trend is present
    /// * `Err(SkipReason)` if the fit is undefined
    pub fn detect(
        &self,
        metric: Metric,
        history: &RunningStatistics,
    ) -> Result<Option<TrendAnomaly>, SkipReason> {
        if history.count() < self.min_samples as u64 {
            return Err(SkipReason::ColdWindow);
        }

        let (Some(slope), Some(r_squared)) = (history.slope(metric), history.r_squared(metric))
        else {
            return Err(SkipReason::DegenerateFit);
        };

        let threshold = self.slope_threshold(metric);
        if slope <= threshold || r_squared < self.r_squared_floor {
            return Ok(None);
        }

        Ok(Some(TrendAnomaly {
            metric,
            slope_per_observation: slope,
            slope_threshold: threshold,
            r_squared,
            samples_analyzed: history.count() as usize,
        }))
    }
}

impl Default for TrendDetector {
    fn default() -> Self {
        Self {
            r_squared_floor: 0.5,
            leak_rate_threshold: crate::config::DEFAULT_LEAK_RATE_THRESHOLD,
            degradation_rate_threshold: crate::config::DEFAULT_DEGRADATION_RATE_THRESHOLD,
            min_samples: crate::config::DEFAULT_MIN_SAMPLES,
        }
    }
}

/// Sustained trend details
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAnomaly {
    pub metric: Metric,
    /// Growth in metric units between consecutive observations
    pub slope_per_observation: f64,
    pub slope_threshold: f64,
    /// Quality of the linear fit, 0.0-1.0
    pub r_squared: f64,
    pub samples_analyzed: usize,
}

impl TrendAnomaly {
    /// Better fits are more trustworthy
    pub fn confidence(&self) -> f64 {
        self.r_squared.clamp(0.0, 1.0)
    }
}
