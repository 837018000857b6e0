//! Core data models for the performance monitor
//!
//! Every record here is immutable once created and serializes to the
//! camelCase JSON shape consumed by logs and the HTTP API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification tag recorded when a result exposes none
pub const UNCLASSIFIED: &str = "UNCLASSIFIED";

/// One observed sample of a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Memory delta in bytes across the unit of work (may be negative)
    pub memory_usage: f64,
    /// Elapsed wall-clock time in milliseconds
    pub creation_time: f64,
    /// Units completed within the current frequency window
    pub error_frequency: f64,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl DataPoint {
    pub fn new(memory_usage: f64, creation_time: f64, error_frequency: f64, timestamp: i64) -> Self {
        Self {
            memory_usage,
            creation_time,
            error_frequency,
            timestamp,
        }
    }

    /// Value of a single metric
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::MemoryUsage => self.memory_usage,
            Metric::CreationTime => self.creation_time,
            Metric::ErrorFrequency => self.error_frequency,
        }
    }
}

/// Metrics tracked per data point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    MemoryUsage,
    CreationTime,
    ErrorFrequency,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::MemoryUsage, Metric::CreationTime, Metric::ErrorFrequency];

    pub(crate) fn index(&self) -> usize {
        match self {
            Metric::MemoryUsage => 0,
            Metric::CreationTime => 1,
            Metric::ErrorFrequency => 2,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::MemoryUsage => write!(f, "memoryUsage"),
            Metric::CreationTime => write!(f, "creationTime"),
            Metric::ErrorFrequency => write!(f, "errorFrequency"),
        }
    }
}

/// Instantaneous threshold crossings raised by the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningType {
    SlowOrLarge,
    FrequentOperations,
}

impl std::fmt::Display for WarningType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningType::SlowOrLarge => write!(f, "SLOW_OR_LARGE"),
            WarningType::FrequentOperations => write!(f, "FREQUENT_OPERATIONS"),
        }
    }
}

/// Threshold warning emitted during sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_delta: Option<f64>,
    pub timestamp: i64,
}

impl Warning {
    pub fn slow_or_large(context: &str, creation_time: f64, memory_delta: f64, timestamp: i64) -> Self {
        Self {
            warning_type: WarningType::SlowOrLarge,
            batch_size: None,
            context: Some(context.to_string()),
            creation_time: Some(creation_time),
            memory_delta: Some(memory_delta),
            timestamp,
        }
    }

    pub fn frequent_operations(batch_size: usize, timestamp: i64) -> Self {
        Self {
            warning_type: WarningType::FrequentOperations,
            batch_size: Some(batch_size),
            context: None,
            creation_time: None,
            memory_delta: None,
            timestamp,
        }
    }
}

/// Anomaly classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    MemorySpike,
    MemoryLeak,
    SlowCreation,
    BatchDegradation,
}

impl AnomalyType {
    pub const ALL: [AnomalyType; 4] = [
        AnomalyType::MemorySpike,
        AnomalyType::MemoryLeak,
        AnomalyType::SlowCreation,
        AnomalyType::BatchDegradation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::MemorySpike => "MEMORY_SPIKE",
            AnomalyType::MemoryLeak => "MEMORY_LEAK",
            AnomalyType::SlowCreation => "SLOW_CREATION",
            AnomalyType::BatchDegradation => "BATCH_DEGRADATION",
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector that produced an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionAlgorithm {
    Statistical,
    Trend,
}

impl std::fmt::Display for DetectionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionAlgorithm::Statistical => write!(f, "statistical"),
            DetectionAlgorithm::Trend => write!(f, "trend"),
        }
    }
}

/// Confirmed anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRecord {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub algorithm: DetectionAlgorithm,
    /// Observed value (statistical) or slope per observation (trend)
    pub metric_value: f64,
    /// Window mean (statistical) or slope threshold (trend)
    pub baseline: f64,
    pub confidence: f64,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_response: Option<AutoResponseRecord>,
}

/// Remediation attached to an anomaly when auto-response is enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoResponseRecord {
    pub actions: Vec<String>,
    pub suggestions: Vec<String>,
    /// Whether the actions changed monitor state
    pub applied: bool,
    pub timestamp: i64,
}

/// Running counters maintained by the sampler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    pub total_errors_created: u64,
    pub failed_operations: u64,
    pub batch_operations: u64,
    pub error_type_counts: BTreeMap<String, u64>,
    /// Mean elapsed milliseconds over successful units
    pub average_creation_time: f64,
    pub last_creation_time: f64,
}

/// Results that expose an optional classification tag
///
/// The monitor counts results per tag and never interprets the tag.
pub trait Classified {
    fn classification(&self) -> Option<&str> {
        None
    }
}

impl Classified for () {}

impl<T: Classified> Classified for Option<T> {
    fn classification(&self) -> Option<&str> {
        self.as_ref().and_then(Classified::classification)
    }
}

impl<T: Classified + ?Sized> Classified for Box<T> {
    fn classification(&self) -> Option<&str> {
        (**self).classification()
    }
}

impl<T: Classified> Classified for Vec<T> {}
