//! Automatic remediation for confirmed anomalies
//!
//! Maps each anomaly type to advisory actions and applies the ones that
//! touch monitor state. Applying an action never fails: if it cannot take
//! effect (the window is already at its minimum), the attempt is recorded
//! with `applied = false` and processing continues.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{AnomalyType, AutoResponseRecord};
use crate::window::{RunningStatistics, SlidingWindowBuffer};

/// Suggestion attached to memory anomalies
pub const REDUCE_WINDOW_SUGGESTION: &str = "reduce monitoring window to limit memory growth";

/// Suggestion attached to creation-time anomalies
pub const COMMON_ERRORS_SUGGESTION: &str =
    "use precompiled/cached results to reduce creation overhead";

/// Remediation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    /// Halve the window capacity, clamped to the configured minimum
    ReduceWindowSize,
    /// Advise the producer to reuse cached results
    SuggestCommonErrors,
}

impl RemediationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationAction::ReduceWindowSize => "reduce_window_size",
            RemediationAction::SuggestCommonErrors => "suggest_common_errors",
        }
    }

    pub fn for_anomaly(anomaly_type: AnomalyType) -> (Self, &'static str) {
        match anomaly_type {
            AnomalyType::MemorySpike | AnomalyType::MemoryLeak => {
                (RemediationAction::ReduceWindowSize, REDUCE_WINDOW_SUGGESTION)
            }
            AnomalyType::SlowCreation | AnomalyType::BatchDegradation => {
                (RemediationAction::SuggestCommonErrors, COMMON_ERRORS_SUGGESTION)
            }
        }
    }
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatches auto-responses when enabled
#[derive(Debug, Clone)]
pub struct AutoResponseDispatcher {
    enabled: bool,
    dispatched: u64,
    applied: u64,
}

impl AutoResponseDispatcher {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            dispatched: 0,
            applied: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Apply the remediation for `anomaly_type`
    ///
    /// Returns `None` when auto-response is disabled. Points dropped by a
    /// window reduction are removed from the statistics so both stay in sync.
    pub fn dispatch(
        &mut self,
        anomaly_type: AnomalyType,
        buffer: &mut SlidingWindowBuffer,
        stats: &mut RunningStatistics,
        timestamp: i64,
    ) -> Option<AutoResponseRecord> {
        if !self.enabled {
            return None;
        }

        let (action, suggestion) = RemediationAction::for_anomaly(anomaly_type);
        let applied = match action {
            RemediationAction::ReduceWindowSize => Self::reduce_window(buffer, stats),
            // Advisory only; the cached-results store belongs to the producer
            RemediationAction::SuggestCommonErrors => true,
        };

        self.dispatched += 1;
        if applied {
            self.applied += 1;
        }

        debug!(
            event = "auto_response",
            anomaly_type = %anomaly_type,
            action = %action,
            applied = applied,
            "Auto-response dispatched"
        );

        Some(AutoResponseRecord {
            actions: vec![action.as_str().to_string()],
            suggestions: vec![suggestion.to_string()],
            applied,
            timestamp,
        })
    }

    fn reduce_window(buffer: &mut SlidingWindowBuffer, stats: &mut RunningStatistics) -> bool {
        let current = buffer.capacity();
        let target = (current / 2).max(buffer.min_capacity()).min(current);
        if target == current {
            return false;
        }

        for point in buffer.resize(target) {
            stats.remove(&point);
        }
        true
    }

    /// Total auto-responses dispatched
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Auto-responses whose actions changed state
    pub fn applied(&self) -> u64 {
        self.applied
    }
}
