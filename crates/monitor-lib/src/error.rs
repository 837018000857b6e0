//! Error types for the performance monitor

use thiserror::Error;

/// Errors surfaced by the monitor's public API
///
/// Errors raised by a wrapped unit of work are never converted into this
/// type; they are handed back to the caller unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MonitorError {
    /// Invalid option value supplied at construction
    #[error("invalid configuration value for '{field}': {message}")]
    Configuration {
        /// Option name as it appears in the configuration document
        field: &'static str,
        /// Why the value was rejected
        message: String,
    },

    /// A detection operation was invoked while the monitor is stopped
    #[error("monitor is not detecting; call start() first")]
    NotDetecting,

    /// A configuration document could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigSource(String),
}

impl MonitorError {
    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        MonitorError::Configuration {
            field,
            message: message.into(),
        }
    }

    /// Whether the caller can carry on as if the operation were a no-op
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MonitorError::NotDetecting)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::ConfigSource(err.to_string())
    }
}

/// Why a detector produced nothing for a metric on a given tick
///
/// Never surfaced by the monitor; the engine logs it at debug level and
/// skips the emission for that metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fewer samples than the configured minimum
    ColdWindow,
    /// Standard deviation is zero, z-score undefined
    ZeroVariance,
    /// Too few points for a regression line
    DegenerateFit,
    /// Accumulator produced NaN or infinity
    NonFinite,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ColdWindow => write!(f, "cold_window"),
            SkipReason::ZeroVariance => write!(f, "zero_variance"),
            SkipReason::DegenerateFit => write!(f, "degenerate_fit"),
            SkipReason::NonFinite => write!(f, "non_finite"),
        }
    }
}
