//! Monitor configuration
//!
//! The configuration is fixed at construction. Unknown keys in a
//! configuration document are ignored and missing keys take the defaults
//! below; invalid values are rejected by [`MonitorConfig::validate`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::MonitorError;

/// Default sliding window capacity
pub const DEFAULT_WINDOW_SIZE: usize = 50;

/// Default minimum confidence for an anomaly to be surfaced
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Default instantaneous memory delta threshold (1 MiB)
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 1024.0 * 1024.0;

/// Default instantaneous creation time threshold in milliseconds
pub const DEFAULT_CREATION_TIME_THRESHOLD_MS: f64 = 1.0;

/// Default batch size above which a FREQUENT_OPERATIONS warning fires
pub const DEFAULT_BATCH_SIZE_WARNING: usize = 100;

/// Minimum samples required before any detector emits
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Floor applied when auto-response shrinks the window
pub const DEFAULT_MIN_WINDOW_SIZE: usize = 10;

/// Default memory growth per observation treated as a leak, in bytes
pub const DEFAULT_LEAK_RATE_THRESHOLD: f64 = 10.0;

/// Default creation time growth per observation treated as degradation, in milliseconds
pub const DEFAULT_DEGRADATION_RATE_THRESHOLD: f64 = 0.005;

/// How many standard deviations constitute an anomaly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensitivityLevel {
    #[serde(alias = "low", alias = "Low")]
    Low,
    #[default]
    #[serde(alias = "medium", alias = "Medium")]
    Medium,
    #[serde(alias = "high", alias = "High")]
    High,
}

impl SensitivityLevel {
    /// Z-score threshold for this level (lower is more sensitive)
    pub fn z_threshold(&self) -> f64 {
        match self {
            SensitivityLevel::Low => 3.0,
            SensitivityLevel::Medium => 2.5,
            SensitivityLevel::High => 2.0,
        }
    }
}

impl std::fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensitivityLevel::Low => write!(f, "LOW"),
            SensitivityLevel::Medium => write!(f, "MEDIUM"),
            SensitivityLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Performance monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Sliding window capacity in data points
    pub window_size: usize,
    /// Z-score sensitivity of the statistical detector
    pub sensitivity_level: SensitivityLevel,
    /// Minimum confidence in [0, 1] for an anomaly to be surfaced
    pub confidence_threshold: f64,
    /// Whether confirmed anomalies trigger automatic remediation
    pub auto_response: bool,
    /// Memory delta in bytes above which a SLOW_OR_LARGE warning fires
    pub memory_threshold: f64,
    /// Elapsed milliseconds above which a SLOW_OR_LARGE warning fires
    pub creation_time_threshold: f64,
    /// Batch size above which a FREQUENT_OPERATIONS warning fires
    pub batch_size_warning: usize,
    /// Samples required before detectors emit
    ///
    /// Values above `window_size` could never be reached; see
    /// [`MonitorConfig::effective_min_samples`].
    pub min_samples: usize,
    /// Smallest capacity auto-response may shrink the window to
    pub min_window_size: usize,
    /// Minimum R² for a trend to count as sustained
    pub r_squared_floor: f64,
    /// Memory growth in bytes per observation treated as a leak
    pub leak_rate_threshold: f64,
    /// Creation time growth in milliseconds per observation treated as degradation
    pub degradation_rate_threshold: f64,
    /// Lookback used to derive health status
    pub health_window_secs: u64,
    /// Warnings returned by the realtime status
    pub recent_warning_limit: usize,
    /// Anomaly records returned by the report
    pub recent_anomaly_limit: usize,
    /// Bound on retained warnings and anomaly records
    pub history_capacity: usize,
    /// Age after which housekeeping drops warnings and records
    pub history_retention_secs: u64,
    /// Period of the housekeeping task
    pub housekeeping_interval_secs: u64,
    /// Window used to count operations for the error frequency metric
    pub frequency_window_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            sensitivity_level: SensitivityLevel::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            auto_response: false,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            creation_time_threshold: DEFAULT_CREATION_TIME_THRESHOLD_MS,
            batch_size_warning: DEFAULT_BATCH_SIZE_WARNING,
            min_samples: DEFAULT_MIN_SAMPLES,
            min_window_size: DEFAULT_MIN_WINDOW_SIZE,
            r_squared_floor: 0.5,
            leak_rate_threshold: DEFAULT_LEAK_RATE_THRESHOLD,
            degradation_rate_threshold: DEFAULT_DEGRADATION_RATE_THRESHOLD,
            health_window_secs: 60,
            recent_warning_limit: 20,
            recent_anomaly_limit: 20,
            history_capacity: 100,
            history_retention_secs: 300,
            housekeeping_interval_secs: 30,
            frequency_window_ms: 1000,
        }
    }
}

impl MonitorConfig {
    /// Parse a JSON configuration document and validate it
    pub fn from_json(document: &str) -> Result<Self, MonitorError> {
        let config: MonitorConfig = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Sample minimum the detectors actually use, capped at the window size
    pub fn effective_min_samples(&self) -> usize {
        self.min_samples.min(self.window_size)
    }

    /// Reject values that would make detection meaningless
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.window_size == 0 {
            return Err(MonitorError::config("windowSize", "must be greater than 0"));
        }
        if !self.confidence_threshold.is_finite() || !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(MonitorError::config(
                "confidenceThreshold",
                format!("must be within [0, 1], got {}", self.confidence_threshold),
            ));
        }
        non_negative("memoryThreshold", self.memory_threshold)?;
        non_negative("creationTimeThreshold", self.creation_time_threshold)?;
        non_negative("leakRateThreshold", self.leak_rate_threshold)?;
        non_negative("degradationRateThreshold", self.degradation_rate_threshold)?;
        if self.min_samples < 2 {
            return Err(MonitorError::config("minSamples", "must be at least 2"));
        }
        if self.min_window_size == 0 {
            return Err(MonitorError::config("minWindowSize", "must be greater than 0"));
        }
        if !self.r_squared_floor.is_finite() || !(0.0..=1.0).contains(&self.r_squared_floor) {
            return Err(MonitorError::config(
                "rSquaredFloor",
                format!("must be within [0, 1], got {}", self.r_squared_floor),
            ));
        }
        if self.health_window_secs == 0 {
            return Err(MonitorError::config("healthWindowSecs", "must be greater than 0"));
        }
        if self.recent_warning_limit == 0 || self.recent_anomaly_limit == 0 {
            return Err(MonitorError::config(
                "recentWarningLimit",
                "recent warning and anomaly limits must be greater than 0",
            ));
        }
        if self.history_capacity < self.recent_warning_limit.max(self.recent_anomaly_limit) {
            return Err(MonitorError::config(
                "historyCapacity",
                "must be at least as large as the recent warning and anomaly limits",
            ));
        }
        if self.history_retention_secs == 0 {
            return Err(MonitorError::config("historyRetentionSecs", "must be greater than 0"));
        }
        if self.housekeeping_interval_secs == 0 {
            return Err(MonitorError::config(
                "housekeepingIntervalSecs",
                "must be greater than 0",
            ));
        }
        if self.frequency_window_ms == 0 {
            return Err(MonitorError::config("frequencyWindowMs", "must be greater than 0"));
        }
        Ok(())
    }

    /// Builder-style override of the window size
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Builder-style override of the sensitivity level
    pub fn with_sensitivity(mut self, level: SensitivityLevel) -> Self {
        self.sensitivity_level = level;
        self
    }

    /// Builder-style override of the confidence threshold
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Builder-style toggle for auto-response
    pub fn with_auto_response(mut self, enabled: bool) -> Self {
        self.auto_response = enabled;
        self
    }

    /// Builder-style override of the batch size warning
    pub fn with_batch_size_warning(mut self, batch_size: usize) -> Self {
        self.batch_size_warning = batch_size;
        self
    }

    pub fn health_window(&self) -> Duration {
        Duration::from_secs(self.health_window_secs)
    }

    pub fn history_retention(&self) -> Duration {
        Duration::from_secs(self.history_retention_secs)
    }

    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_secs(self.housekeeping_interval_secs)
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), MonitorError> {
    if !value.is_finite() || value < 0.0 {
        return Err(MonitorError::config(
            field,
            format!("must be a finite, non-negative number, got {}", value),
        ));
    }
    Ok(())
}
