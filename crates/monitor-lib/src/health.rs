//! Health derivation for the monitored pipeline
//!
//! Health is computed on demand from the warning and anomaly history
//! inside a lookback window; there is no stored health state.

use serde::{Deserialize, Serialize};

/// Health of the monitored pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No warnings inside the lookback window
    Healthy,
    /// Warnings, but no anomaly inside the lookback window
    Degraded,
    /// Warnings and at least one anomaly inside the lookback window
    Unhealthy,
}

impl HealthStatus {
    /// Derive status from what happened inside the lookback window
    pub fn derive(recent_warnings: bool, recent_anomalies: bool) -> Self {
        match (recent_warnings, recent_anomalies) {
            (false, _) => HealthStatus::Healthy,
            (true, false) => HealthStatus::Degraded,
            (true, true) => HealthStatus::Unhealthy,
        }
    }

    /// Returns true if the pipeline is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    /// Ready once detection is running and the pipeline is operational
    pub fn evaluate(is_detecting: bool, health: HealthStatus) -> Self {
        if !is_detecting {
            ReadinessResponse {
                ready: false,
                reason: Some("Detection not started".to_string()),
            }
        } else if !health.is_operational() {
            ReadinessResponse {
                ready: false,
                reason: Some("Unresolved anomalies in health window".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_without_warnings() {
        assert_eq!(HealthStatus::derive(false, false), HealthStatus::Healthy);
        // Anomalies alone do not degrade health
        assert_eq!(HealthStatus::derive(false, true), HealthStatus::Healthy);
    }

    #[test]
    fn test_degraded_and_unhealthy() {
        assert_eq!(HealthStatus::derive(true, false), HealthStatus::Degraded);
        assert_eq!(HealthStatus::derive(true, true), HealthStatus::Unhealthy);
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Unhealthy.is_operational());
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }

    #[test]
    fn test_readiness() {
        assert!(!ReadinessResponse::evaluate(false, HealthStatus::Healthy).ready);
        assert!(!ReadinessResponse::evaluate(true, HealthStatus::Unhealthy).ready);

        let ready = ReadinessResponse::evaluate(true, HealthStatus::Degraded);
        assert!(ready.ready);
        assert!(ready.reason.is_none());
    }
}
