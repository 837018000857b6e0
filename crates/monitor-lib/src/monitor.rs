//! Performance monitor façade
//!
//! [`PerformanceMonitor`] wraps units of work, feeds the sampler and the
//! anomaly engine, and hands events to the configured [`EventSink`]. All
//! mutable state sits behind one mutex that is only held for the O(1)
//! bookkeeping of a single observation; the wrapped call itself and event
//! delivery both run outside it.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use tracing::{debug, warn};

use crate::anomaly::AnomalyEngine;
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::health::{HealthStatus, ReadinessResponse};
use crate::housekeeping::Housekeeper;
use crate::models::{AnomalyRecord, Classified, DataPoint};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::probe::{MemoryProbe, ProcessMemoryProbe};
use crate::report::{AnomalyReport, RealtimeStatus, ReportGenerator};
use crate::sampler::MetricSampler;
use crate::sink::{EventSink, MonitorEvent, TracingSink};

const DEFAULT_PIPELINE: &str = "default";

/// Current wall clock in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Everything discarded on `stop()`
struct MonitorState {
    detecting: bool,
    sampler: MetricSampler,
    engine: AnomalyEngine,
    /// Dropping the handle cancels the task
    housekeeper: Option<Housekeeper>,
}

impl MonitorState {
    fn stopped(config: &MonitorConfig) -> Self {
        Self {
            detecting: false,
            sampler: MetricSampler::new(config),
            engine: AnomalyEngine::new(config),
            housekeeper: None,
        }
    }
}

struct MonitorInner {
    config: MonitorConfig,
    reports: ReportGenerator,
    sink: Arc<dyn EventSink>,
    probe: Arc<dyn MemoryProbe>,
    metrics: Option<MonitorMetrics>,
    logger: StructuredLogger,
    state: Mutex<MonitorState>,
}

impl MonitorInner {
    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        // State is plain counters; a panic mid-update leaves it usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn housekeep(&self) {
        let cutoff = now_ms() - self.config.history_retention().as_millis() as i64;
        let mut state = self.lock_state();
        if !state.detecting {
            return;
        }
        let warnings = state.sampler.trim_older_than(cutoff);
        let anomalies = state.engine.trim_older_than(cutoff);
        drop(state);

        if warnings > 0 || anomalies > 0 {
            debug!(
                pipeline = %self.logger.pipeline(),
                warnings_trimmed = warnings,
                anomalies_trimmed = anomalies,
                "Trimmed expired history"
            );
        }
    }
}

/// Builder for [`PerformanceMonitor`]
pub struct PerformanceMonitorBuilder {
    config: MonitorConfig,
    pipeline: String,
    sink: Option<Arc<dyn EventSink>>,
    probe: Option<Arc<dyn MemoryProbe>>,
    metrics: Option<MonitorMetrics>,
}

impl PerformanceMonitorBuilder {
    /// Name used in structured logs
    pub fn pipeline(mut self, name: impl Into<String>) -> Self {
        self.pipeline = name.into();
        self
    }

    /// Where warnings, anomalies and auto-responses go
    ///
    /// Defaults to a [`TracingSink`].
    pub fn sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// How memory deltas are measured
    ///
    /// Defaults to [`ProcessMemoryProbe`].
    pub fn probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Record unit latency and window size in Prometheus
    pub fn metrics(mut self, metrics: MonitorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<PerformanceMonitor, MonitorError> {
        self.config.validate()?;
        if self.config.min_samples > self.config.window_size {
            warn!(
                min_samples = self.config.min_samples,
                window_size = self.config.window_size,
                "minSamples exceeds windowSize; detectors will use windowSize"
            );
        }

        let logger = StructuredLogger::new(self.pipeline);
        let sink = match self.sink {
            Some(sink) => sink,
            None => {
                let tracing_sink = TracingSink::new(logger.clone());
                match &self.metrics {
                    Some(metrics) => Arc::new(tracing_sink.with_metrics(metrics.clone())),
                    None => Arc::new(tracing_sink),
                }
            }
        };
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(ProcessMemoryProbe::new()));

        Ok(PerformanceMonitor {
            inner: Arc::new(MonitorInner {
                reports: ReportGenerator::new(&self.config),
                state: Mutex::new(MonitorState::stopped(&self.config)),
                config: self.config,
                sink,
                probe,
                metrics: self.metrics,
                logger,
            }),
        })
    }
}

/// Real-time performance monitor with anomaly detection
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct PerformanceMonitor {
    inner: Arc<MonitorInner>,
}

impl PerformanceMonitor {
    /// Validate `config` and create a stopped monitor with default
    /// collaborators
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        Self::builder(config).build()
    }

    pub fn builder(config: MonitorConfig) -> PerformanceMonitorBuilder {
        PerformanceMonitorBuilder {
            config,
            pipeline: DEFAULT_PIPELINE.to_string(),
            sink: None,
            probe: None,
            metrics: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Begin detection; returns false if already detecting
    ///
    /// Inside a tokio runtime this also schedules the housekeeping task.
    pub fn start(&self) -> bool {
        let mut state = self.inner.lock_state();
        if state.detecting {
            return false;
        }
        state.detecting = true;

        let weak: Weak<MonitorInner> = Arc::downgrade(&self.inner);
        state.housekeeper = Housekeeper::spawn(
            "perf-monitor-housekeeping",
            self.inner.config.housekeeping_interval(),
            move |token| match weak.upgrade() {
                Some(inner) => inner.housekeep(),
                None => {
                    token.cancel();
                }
            },
        );
        drop(state);

        self.inner.logger.log_start(
            self.inner.config.window_size,
            &self.inner.config.sensitivity_level.to_string(),
        );
        if let Some(metrics) = &self.inner.metrics {
            metrics.set_window(self.inner.config.window_size, 0);
        }
        true
    }

    /// Stop detection and discard all accumulated state
    ///
    /// Returns false if already stopped.
    pub fn stop(&self) -> bool {
        let mut state = self.inner.lock_state();
        if !state.detecting {
            return false;
        }
        let previous = std::mem::replace(&mut *state, MonitorState::stopped(&self.inner.config));
        drop(state);

        if let Some(housekeeper) = &previous.housekeeper {
            housekeeper.cancel();
        }
        drop(previous);

        self.inner.logger.log_stop("requested");
        true
    }

    pub fn is_detecting(&self) -> bool {
        self.inner.lock_state().detecting
    }

    /// Run `f`, recording its elapsed time and memory delta
    ///
    /// The result is returned unchanged. Errors and panics are counted as
    /// failures; a panic is resumed after it has been recorded. While the
    /// monitor is stopped `f` simply runs.
    pub fn monitor_unit_of_work<T, E, F>(&self, context: &str, f: F) -> Result<T, E>
    where
        T: Classified,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.is_detecting() {
            return f();
        }

        let before = self.inner.probe.current_bytes();
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(value)) => {
                let memory_delta = self.memory_delta(before);
                self.complete_success(context, value.classification(), elapsed_ms, memory_delta);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.complete_failure(elapsed_ms);
                Err(err)
            }
            Err(payload) => {
                self.complete_failure(elapsed_ms);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Like [`monitor_unit_of_work`](Self::monitor_unit_of_work) for a batch
    ///
    /// Emits a FREQUENT_OPERATIONS warning when `batch_size` exceeds the
    /// configured limit.
    pub fn monitor_batch<T, E, F>(&self, batch_size: usize, f: F) -> Result<T, E>
    where
        T: Classified,
        F: FnOnce() -> Result<T, E>,
    {
        let warning = {
            let mut state = self.inner.lock_state();
            if state.detecting {
                state.sampler.record_batch(batch_size, now_ms())
            } else {
                None
            }
        };
        if let Some(warning) = warning {
            self.inner.sink.emit(&MonitorEvent::Warning(warning));
        }

        self.monitor_unit_of_work("batch", f)
    }

    /// Await `fut`, recording its elapsed time and memory delta
    ///
    /// A panic while polling propagates without being counted.
    pub async fn monitor_async<T, E, Fut>(&self, context: &str, fut: Fut) -> Result<T, E>
    where
        T: Classified,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.is_detecting() {
            return fut.await;
        }

        let before = self.inner.probe.current_bytes();
        let start = Instant::now();
        let outcome = fut.await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(value) => {
                let memory_delta = self.memory_delta(before);
                self.complete_success(context, value.classification(), elapsed_ms, memory_delta);
                Ok(value)
            }
            Err(err) => {
                self.complete_failure(elapsed_ms);
                Err(err)
            }
        }
    }

    /// Feed a pre-built data point straight to the anomaly engine
    pub fn record_data_point(&self, point: DataPoint) -> Result<Vec<AnomalyRecord>, MonitorError> {
        let mut events = Vec::new();
        let records = {
            let mut state = self.inner.lock_state();
            if !state.detecting {
                return Err(MonitorError::NotDetecting);
            }
            let records = state.engine.observe(point);
            collect_anomaly_events(&records, &mut events);
            self.update_window_gauges(&state);
            records
        };
        self.emit_all(&events);
        Ok(records)
    }

    pub fn realtime_status(&self) -> RealtimeStatus {
        let state = self.inner.lock_state();
        self.inner
            .reports
            .realtime_status(state.detecting, &state.sampler, &state.engine, now_ms())
    }

    pub fn generate_report(&self) -> AnomalyReport {
        let state = self.inner.lock_state();
        self.inner
            .reports
            .anomaly_report(state.detecting, &state.engine, now_ms())
    }

    pub fn health(&self) -> HealthStatus {
        let state = self.inner.lock_state();
        self.inner.reports.health(&state.sampler, &state.engine, now_ms())
    }

    pub fn readiness(&self) -> ReadinessResponse {
        let state = self.inner.lock_state();
        let health = self.inner.reports.health(&state.sampler, &state.engine, now_ms());
        ReadinessResponse::evaluate(state.detecting, health)
    }

    /// Current sliding window capacity (shrinks under auto-response)
    pub fn window_capacity(&self) -> usize {
        self.inner.lock_state().engine.window_capacity()
    }

    /// Independent copy of the sliding window, oldest first
    pub fn window_snapshot(&self) -> Vec<DataPoint> {
        self.inner.lock_state().engine.snapshot()
    }

    fn memory_delta(&self, before: Option<u64>) -> f64 {
        match (before, self.inner.probe.current_bytes()) {
            (Some(before), Some(after)) => after as f64 - before as f64,
            _ => 0.0,
        }
    }

    fn complete_success(
        &self,
        context: &str,
        classification: Option<&str>,
        elapsed_ms: f64,
        memory_delta: f64,
    ) {
        let mut events = Vec::new();
        {
            let mut state = self.inner.lock_state();
            if !state.detecting {
                return;
            }
            let (point, warning) =
                state
                    .sampler
                    .record_success(classification, context, elapsed_ms, memory_delta, now_ms());
            if let Some(warning) = warning {
                events.push(MonitorEvent::Warning(warning));
            }
            let records = state.engine.observe(point);
            collect_anomaly_events(&records, &mut events);
            self.update_window_gauges(&state);
        }

        if let Some(metrics) = &self.inner.metrics {
            metrics.inc_units_observed();
            metrics.observe_unit_duration(elapsed_ms / 1000.0);
        }
        self.emit_all(&events);
    }

    fn complete_failure(&self, elapsed_ms: f64) {
        {
            let mut state = self.inner.lock_state();
            if !state.detecting {
                return;
            }
            state.sampler.record_failure(elapsed_ms);
        }

        if let Some(metrics) = &self.inner.metrics {
            metrics.inc_units_failed();
            metrics.observe_unit_duration(elapsed_ms / 1000.0);
        }
    }

    fn update_window_gauges(&self, state: &MonitorState) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.set_window(state.engine.window_capacity(), state.engine.window_len());
        }
    }

    fn emit_all(&self, events: &[MonitorEvent]) {
        for event in events {
            self.inner.sink.emit(event);
        }
    }
}

fn collect_anomaly_events(records: &[AnomalyRecord], events: &mut Vec<MonitorEvent>) {
    for record in records {
        events.push(MonitorEvent::Anomaly(record.clone()));
        if let Some(response) = &record.auto_response {
            events.push(MonitorEvent::AutoResponse {
                anomaly_type: record.anomaly_type,
                record: response.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensitivityLevel;
    use crate::models::{AnomalyType, WarningType};
    use crate::probe::NullMemoryProbe;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Tagged(&'static str);

    impl Classified for Tagged {
        fn classification(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    fn recording_monitor(config: MonitorConfig) -> (PerformanceMonitor, Arc<Mutex<Vec<MonitorEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = events.clone();
        let monitor = PerformanceMonitor::builder(config)
            .pipeline("test")
            .probe(NullMemoryProbe)
            .sink(move |event: &MonitorEvent| seen.lock().unwrap().push(event.clone()))
            .build()
            .unwrap();
        (monitor, events)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = PerformanceMonitor::new(MonitorConfig::default().with_confidence_threshold(2.0));
        assert!(matches!(result, Err(MonitorError::Configuration { .. })));
    }

    #[test]
    fn test_start_stop_idempotent() {
        let (monitor, _) = recording_monitor(MonitorConfig::default());
        assert!(!monitor.is_detecting());
        assert!(!monitor.stop());

        assert!(monitor.start());
        assert!(!monitor.start());
        assert!(monitor.is_detecting());

        assert!(monitor.stop());
        assert!(!monitor.stop());
        assert!(!monitor.is_detecting());
    }

    #[test]
    fn test_unit_of_work_counts_classification() {
        let (monitor, _) = recording_monitor(MonitorConfig::default());
        monitor.start();

        let value: Result<Tagged, ()> = monitor.monitor_unit_of_work("create", || Ok(Tagged("NETWORK_ERROR")));
        assert_eq!(value.ok().map(|t| t.0), Some("NETWORK_ERROR"));
        let _: Result<(), ()> = monitor.monitor_unit_of_work("create", || Ok(()));

        let stats = monitor.realtime_status().realtime_stats;
        assert_eq!(stats.total_errors_created, 2);
        assert_eq!(stats.error_type_counts.get("NETWORK_ERROR"), Some(&1));
        assert_eq!(stats.error_type_counts.get("UNCLASSIFIED"), Some(&1));
        assert_eq!(monitor.window_snapshot().len(), 2);
    }

    #[test]
    fn test_error_returned_unchanged() {
        let (monitor, _) = recording_monitor(MonitorConfig::default());
        monitor.start();

        let result: Result<(), String> = monitor.monitor_unit_of_work("create", || Err("boom".to_string()));
        assert_eq!(result, Err("boom".to_string()));

        let stats = monitor.realtime_status().realtime_stats;
        assert_eq!(stats.failed_operations, 1);
        assert_eq!(stats.total_errors_created, 0);
        assert!(monitor.window_snapshot().is_empty());
    }

    #[test]
    fn test_panic_recorded_and_resumed() {
        let (monitor, _) = recording_monitor(MonitorConfig::default());
        monitor.start();

        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), ()> = monitor.monitor_unit_of_work("create", || panic!("factory exploded"));
        }));
        assert!(caught.is_err());

        // Monitor keeps working after the panic
        assert!(monitor.is_detecting());
        assert_eq!(monitor.realtime_status().realtime_stats.failed_operations, 1);
    }

    #[test]
    fn test_stopped_monitor_is_transparent() {
        let (monitor, events) = recording_monitor(MonitorConfig::default());

        let result: Result<Tagged, ()> = monitor.monitor_batch(500, || Ok(Tagged("PARSE_ERROR")));
        assert_eq!(result.ok().map(|t| t.0), Some("PARSE_ERROR"));
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(monitor.realtime_status().realtime_stats.total_errors_created, 0);
        assert!(matches!(
            monitor.record_data_point(DataPoint::new(1.0, 1.0, 1.0, 0)),
            Err(MonitorError::NotDetecting)
        ));
    }

    #[test]
    fn test_batch_warning_emitted_once() {
        let (monitor, events) = recording_monitor(MonitorConfig::default().with_batch_size_warning(100));
        monitor.start();

        let _: Result<(), ()> = monitor.monitor_batch(150, || Ok(()));

        let warnings: Vec<_> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::Warning(w) if w.warning_type == WarningType::FrequentOperations => Some(w.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].batch_size, Some(150));
        assert_eq!(monitor.realtime_status().realtime_stats.batch_operations, 1);
    }

    #[test]
    fn test_stop_discards_state() {
        let (monitor, _) = recording_monitor(MonitorConfig::default());
        monitor.start();
        let _: Result<(), ()> = monitor.monitor_batch(500, || Ok(()));
        assert_eq!(monitor.realtime_status().recent_warnings.len(), 1);

        monitor.stop();
        let status = monitor.realtime_status();
        assert!(!status.is_monitoring);
        assert!(status.recent_warnings.is_empty());
        assert_eq!(status.realtime_stats.batch_operations, 0);
        assert!(!monitor.generate_report().detection_status.is_detecting);
    }

    #[test]
    fn test_memory_delta_from_probe() {
        let reading = Arc::new(AtomicU64::new(1_000));
        let probe_reading = reading.clone();
        let config = MonitorConfig {
            memory_threshold: 4_096.0,
            ..Default::default()
        };
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = events.clone();
        let monitor = PerformanceMonitor::builder(config)
            .probe(move || Some(probe_reading.load(Ordering::SeqCst)))
            .sink(move |event: &MonitorEvent| seen.lock().unwrap().push(event.clone()))
            .build()
            .unwrap();
        monitor.start();

        let _: Result<(), ()> = monitor.monitor_unit_of_work("alloc", || {
            reading.fetch_add(10_000, Ordering::SeqCst);
            Ok(())
        });

        let point = monitor.window_snapshot()[0];
        assert_eq!(point.memory_usage, 10_000.0);
        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            MonitorEvent::Warning(w) if w.warning_type == WarningType::SlowOrLarge
                && w.context.as_deref() == Some("alloc")
        )));
    }

    #[test]
    fn test_record_data_point_emits_anomaly_events() {
        let config = MonitorConfig::default()
            .with_sensitivity(SensitivityLevel::High)
            .with_auto_response(true);
        let (monitor, events) = recording_monitor(config);
        monitor.start();

        for i in 0..30 {
            monitor
                .record_data_point(DataPoint::new(1000.0 + 50.0 * i as f64, 0.5, 1.0, i * 100))
                .unwrap();
        }

        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            MonitorEvent::Anomaly(r) if r.anomaly_type == AnomalyType::MemoryLeak
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, MonitorEvent::AutoResponse { .. })));
        assert!(monitor.window_capacity() < 50);
    }

    #[test]
    fn test_sink_may_call_back_into_monitor() {
        let monitor_slot: Arc<Mutex<Option<PerformanceMonitor>>> = Arc::new(Mutex::new(None));
        let slot = monitor_slot.clone();
        let reads = Arc::new(AtomicU64::new(0));
        let counter = reads.clone();

        let monitor = PerformanceMonitor::builder(MonitorConfig::default())
            .probe(NullMemoryProbe)
            .sink(move |_: &MonitorEvent| {
                if let Some(monitor) = slot.lock().unwrap().as_ref() {
                    let _ = monitor.realtime_status();
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();
        *monitor_slot.lock().unwrap() = Some(monitor.clone());
        monitor.start();

        let _: Result<(), ()> = monitor.monitor_batch(500, || Ok(()));
        assert!(reads.load(Ordering::SeqCst) >= 1);

        // Break the reference cycle
        monitor_slot.lock().unwrap().take();
    }

    #[tokio::test]
    async fn test_monitor_async() {
        let (monitor, _) = recording_monitor(MonitorConfig::default());
        monitor.start();

        let ok: Result<Tagged, ()> = monitor
            .monitor_async("fetch", async { Ok(Tagged("TIMEOUT_ERROR")) })
            .await;
        assert!(ok.is_ok());
        let err: Result<(), &str> = monitor.monitor_async("fetch", async { Err("nope") }).await;
        assert_eq!(err, Err("nope"));

        let stats = monitor.realtime_status().realtime_stats;
        assert_eq!(stats.total_errors_created, 1);
        assert_eq!(stats.failed_operations, 1);
        assert_eq!(stats.error_type_counts.get("TIMEOUT_ERROR"), Some(&1));
        monitor.stop();
    }

    #[tokio::test]
    async fn test_housekeeping_cancelled_on_stop() {
        let (monitor, _) = recording_monitor(MonitorConfig::default());
        monitor.start();
        let token = {
            let state = monitor.inner.lock_state();
            state.housekeeper.as_ref().map(|h| h.token())
        };
        let token = token.expect("housekeeper spawned inside runtime");
        assert!(!token.is_cancelled());

        monitor.stop();
        assert!(token.is_cancelled());
    }
}
