//! Event delivery for warnings, anomalies and auto-responses
//!
//! The monitor has no dependency on a console or transport: everything it
//! emits goes through an [`EventSink`]. Sinks are invoked after internal
//! locks are released, so a sink may call back into the monitor.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::{AnomalyRecord, AnomalyType, AutoResponseRecord, Warning};
use crate::observability::{MonitorMetrics, StructuredLogger};

/// Something the monitor emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorEvent {
    Warning(Warning),
    Anomaly(AnomalyRecord),
    AutoResponse {
        anomaly_type: AnomalyType,
        record: AutoResponseRecord,
    },
}

/// Receiver of monitor events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &MonitorEvent);
}

impl<F> EventSink for F
where
    F: Fn(&MonitorEvent) + Send + Sync,
{
    fn emit(&self, event: &MonitorEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &MonitorEvent) {}
}

/// Writes events as structured logs and counts them in Prometheus
#[derive(Clone)]
pub struct TracingSink {
    logger: StructuredLogger,
    metrics: Option<MonitorMetrics>,
}

impl TracingSink {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            logger,
            metrics: None,
        }
    }

    /// Also count events in the global Prometheus registry
    pub fn with_metrics(mut self, metrics: MonitorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &MonitorEvent) {
        match event {
            MonitorEvent::Warning(warning) => {
                self.logger.log_warning(warning);
                if let Some(metrics) = &self.metrics {
                    metrics.inc_warning(warning);
                }
            }
            MonitorEvent::Anomaly(record) => {
                self.logger.log_anomaly(record);
                if let Some(metrics) = &self.metrics {
                    metrics.inc_anomaly(record.anomaly_type, record.algorithm);
                }
            }
            MonitorEvent::AutoResponse {
                anomaly_type,
                record,
            } => {
                self.logger.log_auto_response(*anomaly_type, record);
                if let Some(metrics) = &self.metrics {
                    metrics.inc_auto_response(record);
                }
            }
        }
    }
}

/// Forwards events to an unbounded channel
///
/// Sending never blocks the hot path; events are dropped silently once the
/// receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &MonitorEvent) {
        let _ = self.tx.send(event.clone());
    }
}
