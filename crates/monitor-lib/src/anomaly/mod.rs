//! Anomaly detection for unit-of-work performance
//!
//! This module provides detection for:
//! - Instantaneous spikes (z-score against the window's running statistics)
//! - Sustained trends (least-squares slope and fit quality over the window)
//! - Automatic remediation of confirmed anomalies

mod engine;
mod responder;
mod spike_detector;
mod trend_detector;

pub use engine::AnomalyEngine;
pub use responder::{
    AutoResponseDispatcher, RemediationAction, COMMON_ERRORS_SUGGESTION, REDUCE_WINDOW_SUGGESTION,
};
pub use spike_detector::{SpikeAnomaly, StatisticalDetector};
pub use trend_detector::{TrendAnomaly, TrendDetector};
