//! Real-time performance monitor with anomaly detection
//!
//! This crate provides the core functionality for:
//! - Wrapping high-frequency units of work and sampling their latency and memory delta
//! - Bounded sliding-window statistics updated incrementally per observation
//! - Spike (z-score) and trend (least-squares) anomaly detection
//! - Optional automatic remediation of confirmed anomalies
//! - Status and report snapshots, health derivation and observability

pub mod anomaly;
pub mod config;
pub mod error;
pub mod health;
pub mod housekeeping;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod probe;
pub mod report;
pub mod sampler;
pub mod sink;
pub mod window;


pub use config::{MonitorConfig, SensitivityLevel};
pub use error::MonitorError;
pub use health::{HealthStatus, ReadinessResponse};
pub use models::*;
pub use monitor::{PerformanceMonitor, PerformanceMonitorBuilder};
pub use observability::{MonitorMetrics, StructuredLogger};
pub use probe::{MemoryProbe, NullMemoryProbe, ProcessMemoryProbe};
pub use report::{AnomalyReport, AnomalyStatistics, DetectionStatus, RealtimeStatus, ReportGenerator};
pub use sink::{ChannelSink, EventSink, MonitorEvent, NullSink, TracingSink};
